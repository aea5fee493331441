use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No GENAI_KEYS configured")]
    NoCredentials,
    #[error("No valid GENAI_KEYS found. Last error: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: AIError,
    },
    #[error("Failed to parse questions: {0}. Raw response: {1}")]
    Parse(#[source] serde_json::Error, String),
    #[error("Generator endpoint error: {0}")]
    Remote(String),
}

impl GenerationError {
    /// The underlying error of the last credential tried, if any.
    pub fn last_error(&self) -> Option<&AIError> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AIError {
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Mock error: {0}")]
    Mock(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Prompt is empty")]
    EmptyPrompt,
    #[error("A generation request is already in flight")]
    AlreadyLoading,
    #[error("No question number {0}")]
    NoSuchQuestion(usize),
    #[error("Question {question} has no answer number {answer}")]
    NoSuchAnswer { question: usize, answer: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
