//! Render model for a `QuizSession`: what each question and option looks like,
//! independent of the front-end that draws it.

use crate::quiz::{Phase, QuizSession};

pub const SELECT_HINT: &str = "Select the correct answer:";
pub const ANSWER_THIS: &str = "Please answer this question.";

/// Decoration of a single answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Neutral,
    /// Selected and correct, results shown
    Correct,
    /// Selected and wrong, results shown
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub text: String,
    pub selected: bool,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based
    pub number: usize,
    pub text: String,
    /// Outlined until the question gets an answer
    pub flagged: bool,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: Phase,
    pub error: Option<String>,
    pub questions: Vec<QuestionView>,
    /// `(score, total)` once results are shown
    pub score: Option<(usize, usize)>,
}

impl SessionView {
    pub fn score_line(&self) -> Option<String> {
        self.score.map(|(score, total)| format!("Score: {} / {}", score, total))
    }
}

pub fn render(session: &QuizSession) -> SessionView {
    let revealed = session.show_results();

    let questions = session
        .questions()
        .iter()
        .enumerate()
        .map(|(q_idx, item)| {
            let chosen = session.selected().get(q_idx).copied().flatten();
            let options = item
                .answers
                .iter()
                .enumerate()
                .map(|(a_idx, text)| {
                    let selected = chosen == Some(a_idx);
                    let mark = match (revealed && selected, item.is_correct(a_idx)) {
                        (true, true) => Mark::Correct,
                        (true, false) => Mark::Wrong,
                        (false, _) => Mark::Neutral,
                    };
                    OptionView { text: text.clone(), selected, mark }
                })
                .collect();

            QuestionView {
                number: q_idx + 1,
                text: item.question.clone(),
                flagged: session.is_flagged(q_idx),
                options,
            }
        })
        .collect();

    SessionView {
        phase: session.phase(),
        error: session.error().map(str::to_string),
        questions,
        score: revealed.then(|| (session.score(), session.questions().len())),
    }
}
