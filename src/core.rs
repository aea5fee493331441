//! Core generation API: a credential-rotating wrapper around a low-level model
//! client, with fence-tolerant JSON parsing of the model's answer.
//!
//! - `LowLevelClient` talks to one provider with one key
//! - `ClientFactory` builds a client for a given key
//! - `QuestionGenerator` walks the `CredentialPool` in order and turns the
//!   first successful response into `QuizItem`s
//! - `QuizSource` is what front-ends call, in-process or over HTTP

use crate::config::{CredentialPool, GeneratorConfig, KeyCheck, ParseFailure};
use crate::error::{AIError, GenerationError};
use crate::json_utils::parse_fenced_array;
use crate::models::QuizItem;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything a provider needs for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: String,
    pub max_output_tokens: u32,
}

/// Low-level model client bound to a single credential.
///
/// Implementors execute one request and return the raw model text; cleanup and
/// parsing are done by `QuestionGenerator`.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    async fn generate_content(&self, request: GenerationRequest) -> Result<String, AIError>;

    /// Cheap call that fails when the credential is unusable.
    async fn probe(&self) -> Result<(), AIError>;
}

/// Builds a `LowLevelClient` for a credential taken from the pool.
pub trait ClientFactory: Send + Sync + Debug {
    type Client: LowLevelClient;

    fn client_for(&self, api_key: &str) -> Self::Client;
}

/// Anything that can turn a prompt into quiz questions.
#[async_trait]
pub trait QuizSource: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<QuizItem>, GenerationError>;
}

#[async_trait]
impl<S: QuizSource + ?Sized> QuizSource for Arc<S> {
    async fn generate(&self, prompt: &str) -> Result<Vec<QuizItem>, GenerationError> {
        self.as_ref().generate(prompt).await
    }
}

#[async_trait]
impl<S: QuizSource + ?Sized> QuizSource for Box<S> {
    async fn generate(&self, prompt: &str) -> Result<Vec<QuizItem>, GenerationError> {
        self.as_ref().generate(prompt).await
    }
}

/// Question generator over an explicit credential pool.
#[derive(Debug, Clone)]
pub struct QuestionGenerator<F: ClientFactory> {
    factory: F,
    pool: CredentialPool,
    config: GeneratorConfig,
}

impl<F: ClientFactory> QuestionGenerator<F> {
    pub fn new(factory: F, pool: CredentialPool, config: GeneratorConfig) -> Self {
        info!(
            keys = pool.len(),
            model = %config.model,
            key_check = ?config.key_check,
            "Creating new QuestionGenerator"
        );
        Self { factory, pool, config }
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn request_for(&self, prompt: &str) -> GenerationRequest {
        GenerationRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            system_instruction: self.config.system_instruction.clone(),
            max_output_tokens: self.config.max_output_tokens,
        }
    }

    /// Generate questions for `prompt`.
    ///
    /// Credentials are tried left to right and the first one that answers is
    /// used. When every one fails the error carries the last failure. A response
    /// that is not a JSON array yields no questions unless the config asks for
    /// `ParseFailure::Error`.
    #[instrument(target = "quizgen::generator", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<Vec<QuizItem>, GenerationError> {
        let total = self.pool.len();
        let request = self.request_for(prompt);
        let mut last_error: Option<AIError> = None;

        for (i, key) in self.pool.keys().iter().enumerate() {
            let client = self.factory.client_for(key);
            match self.attempt(&client, request.clone()).await {
                Ok(raw) => {
                    info!(key_number = i + 1, key_count = total, "Using GENAI key {} of {}", i + 1, total);
                    return self.parse_response(&raw);
                }
                Err(e) => {
                    warn!(key_number = i + 1, key_count = total, error = %e, "GENAI key failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(GenerationError::Exhausted { attempts: total, last }),
            None => {
                warn!("No GENAI keys configured");
                Err(GenerationError::NoCredentials)
            }
        }
    }

    async fn attempt(&self, client: &F::Client, request: GenerationRequest) -> Result<String, AIError> {
        if self.config.key_check == KeyCheck::Probe {
            client.probe().await?;
            debug!("Credential probe succeeded");
        }
        client.generate_content(request).await
    }

    fn parse_response(&self, raw: &str) -> Result<Vec<QuizItem>, GenerationError> {
        debug!(raw = %raw, "Raw model response");

        match parse_fenced_array::<QuizItem>(raw) {
            Ok(items) => {
                info!(questions = items.len(), "Parsed questions");
                debug!(?items, "Parsed question list");
                Ok(items)
            }
            Err(e) => match self.config.parse_failure {
                ParseFailure::Empty => {
                    warn!(error = %e, "Failed to parse questions");
                    Ok(Vec::new())
                }
                ParseFailure::Error => Err(GenerationError::Parse(e, raw.to_string())),
            },
        }
    }
}

#[async_trait]
impl<F: ClientFactory> QuizSource for QuestionGenerator<F> {
    async fn generate(&self, prompt: &str) -> Result<Vec<QuizItem>, GenerationError> {
        QuestionGenerator::generate(self, prompt).await
    }
}
