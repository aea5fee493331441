pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod json_utils;
pub mod models;
pub mod quiz;
pub mod remote;
pub mod server;
pub mod tui;
pub mod view;

// Convenient re-exports
pub use crate::core::{QuestionGenerator, QuizSource};
pub use error::GenerationError;
pub use models::QuizItem;
pub use quiz::QuizSession;
