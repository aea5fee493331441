use crate::config::DEFAULT_BASE_URL;
use crate::core::{ClientFactory, GenerationRequest, LowLevelClient};
use crate::error::{AIError, GeminiError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Client for the Gemini `generateContent` REST endpoint, bound to one API key.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

// Hand-written so the key stays out of logs
impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http_client(api_key, DEFAULT_BASE_URL, Client::new())
    }

    /// Reuse an existing connection pool, e.g. one shared by a `GeminiFactory`
    pub fn with_http_client(api_key: impl Into<String>, base_url: impl Into<String>, client: Client) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn models_url(&self) -> String {
        format!("{}/v1beta/models", self.base_url)
    }

    async fn check_status(response: Response) -> Result<Response, AIError> {
        let status = response.status();
        debug!(status = %status, "Received response from Gemini API");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limit exceeded");
            return Err(GeminiError::RateLimit.into());
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Gemini API authentication failed");
            return Err(GeminiError::Authentication.into());
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            // Gemini reports a bad key as 400 INVALID_ARGUMENT
            if error_text.contains("API_KEY_INVALID") {
                error!("Gemini API rejected the key");
                return Err(GeminiError::Authentication.into());
            }
            error!(status = %status, error = %error_text, "Gemini API error");
            return Err(GeminiError::Api(format!("{}: {}", status, error_text)).into());
        }
        Ok(response)
    }
}

fn http_error(e: reqwest::Error) -> AIError {
    error!(error = %e, "HTTP request failed");
    GeminiError::Http(e.to_string()).into()
}

#[async_trait]
impl LowLevelClient for GeminiClient {
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len(), model = %request.model))]
    async fn generate_content(&self, request: GenerationRequest) -> Result<String, AIError> {
        debug!(max_output_tokens = request.max_output_tokens, "Preparing Gemini API request");

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: request.prompt }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: request.system_instruction }],
            },
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.generate_url(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;
        let response = Self::check_status(response).await?;

        // A 2xx means the key works; an unusable body becomes empty text
        let gemini_response: GeminiResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Failed to parse Gemini response JSON");
                return Ok(String::new());
            }
        };

        debug!(candidates = gemini_response.candidates.len(), "Parsed Gemini response");

        let text: String = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.is_empty() {
            warn!("No text in Gemini response");
            return Ok(text);
        }

        info!(response_len = text.len(), "Successfully received Gemini response");
        Ok(text)
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> Result<(), AIError> {
        let response = self
            .client
            .get(self.models_url())
            .query(&[("pageSize", "1")])
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(http_error)?;
        Self::check_status(response).await?;
        Ok(())
    }
}

/// Builds `GeminiClient`s that share one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct GeminiFactory {
    base_url: String,
    client: Client,
}

impl Default for GeminiFactory {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl GeminiFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: Client::new() }
    }
}

impl ClientFactory for GeminiFactory {
    type Client = GeminiClient;

    fn client_for(&self, api_key: &str) -> GeminiClient {
        GeminiClient::with_http_client(api_key, self.base_url.clone(), self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_gemini_field_names() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: "capitals".to_string() }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: "be brief".to_string() }],
            },
            generation_config: GeminiGenerationConfig { max_output_tokens: 1000 },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "capitals");
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(v["systemInstruction"].get("role").is_none());
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn response_without_candidates_deserializes() {
        let r: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(r.candidates.is_empty());
    }

    #[test]
    fn urls_drop_trailing_slash() {
        let c = GeminiClient::with_http_client("k", "http://localhost:9/", Client::new());
        assert_eq!(c.generate_url("gemini-2.0-flash"), "http://localhost:9/v1beta/models/gemini-2.0-flash:generateContent");
        assert_eq!(c.models_url(), "http://localhost:9/v1beta/models");
    }

    #[test]
    fn debug_hides_key() {
        let c = GeminiClient::new("super-secret");
        assert!(!format!("{:?}", c).contains("super-secret"));
    }
}
