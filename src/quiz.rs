//! Client-side quiz session: prompt, generated questions, selections,
//! validation and scoring. Lives only in memory; a new generation replaces it.

use crate::error::{GenerationError, SessionError};
use crate::models::QuizItem;
use tracing::{debug, info};

pub const GENERATION_FAILED: &str = "Failed to generate questions.";

/// Where the session is, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No questions to show
    Idle,
    /// A generation call is in flight
    Loading,
    /// Questions present, results hidden
    Ready,
    /// Every question answered and results shown
    Revealed,
}

/// Outcome of `QuizSession::check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Results are shown; carries the score
    Revealed { score: usize, total: usize },
    /// Some questions still need an answer (1-based numbers)
    Unanswered(Vec<usize>),
    /// Nothing to check
    NoQuestions,
}

#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    prompt: String,
    questions: Vec<QuizItem>,
    selected: Vec<Option<usize>>,
    show_results: bool,
    unanswered: Vec<usize>,
    error: Option<String>,
    loading: bool,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.questions.is_empty() {
            Phase::Idle
        } else if self.show_results {
            Phase::Revealed
        } else {
            Phase::Ready
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn prompt_mut(&mut self) -> &mut String {
        &mut self.prompt
    }

    pub fn questions(&self) -> &[QuizItem] {
        &self.questions
    }

    pub fn selected(&self) -> &[Option<usize>] {
        &self.selected
    }

    /// Selections with `-1` standing for "unanswered"
    pub fn selected_answers(&self) -> Vec<i64> {
        self.selected
            .iter()
            .map(|s| s.map_or(-1, |a| a as i64))
            .collect()
    }

    pub fn show_results(&self) -> bool {
        self.show_results
    }

    /// 1-based numbers of the questions that failed the last check
    pub fn unanswered(&self) -> &[usize] {
        &self.unanswered
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_generate(&self) -> bool {
        !self.loading && !self.prompt.trim().is_empty()
    }

    /// Enter `Loading` and hand back the prompt to send.
    pub fn begin_generation(&mut self) -> Result<String, SessionError> {
        if self.loading {
            return Err(SessionError::AlreadyLoading);
        }
        if self.prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        self.loading = true;
        self.error = None;
        self.show_results = false;
        self.unanswered.clear();
        debug!(prompt_len = self.prompt.len(), "Generation started");
        Ok(self.prompt.clone())
    }

    /// Leave `Loading` with the generator's result.
    ///
    /// On failure the previous questions and selections are kept and only the
    /// generic error message is set.
    pub fn finish_generation(&mut self, result: Result<Vec<QuizItem>, GenerationError>) {
        self.loading = false;
        match result {
            Ok(questions) => {
                info!(questions = questions.len(), "Quiz loaded");
                self.selected = vec![None; questions.len()];
                self.questions = questions;
                self.error = None;
                self.show_results = false;
                self.unanswered.clear();
            }
            Err(e) => {
                info!(error = %e, "Generation failed");
                self.error = Some(GENERATION_FAILED.to_string());
            }
        }
    }

    /// Pick answer `answer` for question `question` (both zero-based).
    pub fn select(&mut self, question: usize, answer: usize) -> Result<(), SessionError> {
        let item = self
            .questions
            .get(question)
            .ok_or(SessionError::NoSuchQuestion(question + 1))?;
        if answer >= item.answers.len() {
            return Err(SessionError::NoSuchAnswer { question: question + 1, answer: answer + 1 });
        }
        self.selected[question] = Some(answer);
        self.show_results = false;
        self.error = None;
        self.unanswered.clear();
        Ok(())
    }

    /// Validate that every question has an answer; reveal results if so.
    pub fn check(&mut self) -> CheckOutcome {
        if self.questions.is_empty() {
            return CheckOutcome::NoQuestions;
        }

        let missing: Vec<usize> = self
            .selected
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i + 1)
            .collect();

        if !missing.is_empty() {
            let list = missing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            self.error = Some(format!("Please answer all questions. Unanswered: {}", list));
            self.unanswered = missing.clone();
            self.show_results = false;
            return CheckOutcome::Unanswered(missing);
        }

        self.error = None;
        self.unanswered.clear();
        self.show_results = true;
        CheckOutcome::Revealed { score: self.score(), total: self.questions.len() }
    }

    /// Number of questions whose selection matches the correct answer.
    pub fn score(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.selected)
            .filter(|(q, s)| s.is_some_and(|a| q.is_correct(a)))
            .count()
    }

    pub fn is_flagged(&self, question: usize) -> bool {
        self.unanswered.contains(&(question + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(correct: usize) -> QuizItem {
        QuizItem::new("q", ["a", "b", "c"], correct)
    }

    fn loaded(correct: &[usize]) -> QuizSession {
        let mut s = QuizSession::new();
        s.set_prompt("topic");
        s.begin_generation().unwrap();
        s.finish_generation(Ok(correct.iter().map(|&c| item(c)).collect()));
        s
    }

    #[test]
    fn starts_idle() {
        let s = QuizSession::new();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.can_generate());
    }

    #[test]
    fn blank_prompt_cannot_generate() {
        let mut s = QuizSession::new();
        s.set_prompt("   ");
        assert_eq!(s.begin_generation(), Err(SessionError::EmptyPrompt));
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn loading_blocks_second_call() {
        let mut s = QuizSession::new();
        s.set_prompt("rust");
        assert_eq!(s.begin_generation().unwrap(), "rust");
        assert_eq!(s.phase(), Phase::Loading);
        assert!(!s.can_generate());
        assert_eq!(s.begin_generation(), Err(SessionError::AlreadyLoading));
    }

    #[test]
    fn success_resets_selections() {
        let s = loaded(&[0, 1, 2]);
        assert_eq!(s.phase(), Phase::Ready);
        assert_eq!(s.selected_answers(), vec![-1, -1, -1]);
        assert_eq!(s.error(), None);
    }

    #[test]
    fn empty_result_goes_back_to_idle_without_error() {
        let mut s = QuizSession::new();
        s.set_prompt("x");
        s.begin_generation().unwrap();
        s.finish_generation(Ok(vec![]));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.error(), None);
    }

    #[test]
    fn failure_keeps_previous_questions() {
        let mut s = loaded(&[0, 1]);
        s.select(0, 2).unwrap();
        s.begin_generation().unwrap();
        s.finish_generation(Err(GenerationError::NoCredentials));
        assert_eq!(s.error(), Some(GENERATION_FAILED));
        assert_eq!(s.questions().len(), 2);
        assert_eq!(s.selected(), &[Some(2), None]);
        assert_eq!(s.phase(), Phase::Ready);
    }

    #[test]
    fn failure_from_idle_stays_idle() {
        let mut s = QuizSession::new();
        s.set_prompt("x");
        s.begin_generation().unwrap();
        s.finish_generation(Err(GenerationError::Remote("down".into())));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.error(), Some(GENERATION_FAILED));
    }

    #[test]
    fn unanswered_question_blocks_reveal() {
        let mut s = loaded(&[0, 1, 2]);
        s.select(0, 0).unwrap();
        s.select(2, 1).unwrap();
        assert_eq!(s.check(), CheckOutcome::Unanswered(vec![2]));
        assert_eq!(s.phase(), Phase::Ready);
        assert_eq!(s.unanswered(), &[2]);
        assert!(!s.show_results());
        assert_eq!(s.error(), Some("Please answer all questions. Unanswered: 2"));
        assert!(s.is_flagged(1));
        assert!(!s.is_flagged(0));
    }

    #[test]
    fn selecting_clears_validation_state() {
        let mut s = loaded(&[0, 1]);
        s.check();
        assert_eq!(s.unanswered(), &[1, 2]);
        s.select(1, 1).unwrap();
        assert!(s.unanswered().is_empty());
        assert_eq!(s.error(), None);
    }

    #[test]
    fn all_answered_reveals_and_scores() {
        let mut s = loaded(&[0, 2, 2]);
        s.select(0, 0).unwrap();
        s.select(1, 1).unwrap();
        s.select(2, 2).unwrap();
        assert_eq!(s.check(), CheckOutcome::Revealed { score: 2, total: 3 });
        assert_eq!(s.phase(), Phase::Revealed);
        assert_eq!(s.score(), 2);
    }

    #[test]
    fn check_is_idempotent_when_revealed() {
        let mut s = loaded(&[0, 2, 2]);
        for (q, a) in [(0, 0), (1, 1), (2, 2)] {
            s.select(q, a).unwrap();
        }
        let first = s.check();
        let second = s.check();
        assert_eq!(first, second);
        assert_eq!(s.phase(), Phase::Revealed);
        assert_eq!(s.score(), 2);
    }

    #[test]
    fn selecting_after_reveal_hides_results() {
        let mut s = loaded(&[0]);
        s.select(0, 0).unwrap();
        s.check();
        s.select(0, 1).unwrap();
        assert_eq!(s.phase(), Phase::Ready);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn select_rejects_out_of_range() {
        let mut s = loaded(&[0]);
        assert_eq!(s.select(3, 0), Err(SessionError::NoSuchQuestion(4)));
        assert_eq!(s.select(0, 7), Err(SessionError::NoSuchAnswer { question: 1, answer: 8 }));
    }

    #[test]
    fn out_of_range_correct_answer_never_scores() {
        let mut s = loaded(&[9]);
        s.select(0, 2).unwrap();
        assert_eq!(s.check(), CheckOutcome::Revealed { score: 0, total: 1 });
    }

    #[test]
    fn check_without_questions_is_noop() {
        let mut s = QuizSession::new();
        assert_eq!(s.check(), CheckOutcome::NoQuestions);
        assert_eq!(s.phase(), Phase::Idle);
    }
}
