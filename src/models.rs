use serde::{Deserialize, Serialize};

/// One multiple-choice question as produced by the model.
///
/// `correct_answer` is a zero-based index into `answers`. Nothing checks that
/// it is in range; an out-of-range item can be answered but never scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub answers: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: usize,
}

impl QuizItem {
    pub fn new<S: Into<String>>(question: impl Into<String>, answers: impl IntoIterator<Item = S>, correct_answer: usize) -> Self {
        Self {
            question: question.into(),
            answers: answers.into_iter().map(Into::into).collect(),
            correct_answer,
        }
    }

    pub fn is_correct(&self, answer: usize) -> bool {
        self.correct_answer == answer
    }
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Error body returned by the HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
