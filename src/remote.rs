use crate::core::QuizSource;
use crate::error::GenerationError;
use crate::models::{ErrorBody, GenerateRequest, QuizItem};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, instrument};

/// `QuizSource` that calls a running `quizgen serve` over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteGenerator {
    base_url: String,
    client: Client,
}

impl RemoteGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl QuizSource for RemoteGenerator {
    #[instrument(target = "quizgen::remote", skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<Vec<QuizItem>, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&GenerateRequest { prompt: prompt.to_string() })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GenerationError::Remote(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from generator");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            error!(status = %status, error = %message, "Generator returned an error");
            return Err(GenerationError::Remote(message));
        }

        response
            .json::<Vec<QuizItem>>()
            .await
            .map_err(|e| GenerationError::Remote(e.to_string()))
    }
}
