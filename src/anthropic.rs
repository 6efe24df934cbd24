//! Anthropic generation provider using the Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// The Anthropic Messages API endpoint.
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// The API version header value the Messages API requires.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The default generation model.
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Default generation parameters for grounded answering: short answers,
/// low temperature.
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// A [`GenerationProvider`] backed by the Anthropic Messages API.
///
/// Uses `reqwest` to call `/v1/messages` directly with a system
/// instruction and a single user message.
///
/// # Configuration
///
/// - `model` – defaults to `claude-3-haiku-20240307`.
/// - `max_tokens` / `temperature` – default to 1000 / 0.3.
/// - `api_key` – from the constructor or the `ANTHROPIC_API_KEY`
///   environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::anthropic::AnthropicGenerationProvider;
///
/// let provider = AnthropicGenerationProvider::new("sk-ant-...")?;
/// let answer = provider.generate("You are terse.", "Say hi.").await?;
/// ```
#[derive(Debug)]
pub struct AnthropicGenerationProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicGenerationProvider {
    /// Create a new provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Generation {
                provider: "Anthropic".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Create a new provider using the `ANTHROPIC_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| RagError::Generation {
            provider: "Anthropic".into(),
            message: "ANTHROPIC_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ── Anthropic API request/response types ───────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── GenerationProvider implementation ──────────────────────────────

#[async_trait]
impl GenerationProvider for AnthropicGenerationProvider {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        debug!(
            provider = "Anthropic",
            model = %self.model,
            prompt_len = prompt.len(),
            "generating answer"
        );

        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Anthropic", error = %e, "request failed");
                RagError::Generation {
                    provider: "Anthropic".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Anthropic", %status, "API error");
            return Err(RagError::Generation {
                provider: "Anthropic".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let messages_response: MessagesResponse = response.json().await.map_err(|e| {
            error!(provider = "Anthropic", error = %e, "failed to parse response");
            RagError::Generation {
                provider: "Anthropic".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        messages_response.content.into_iter().next().map(|block| block.text).ok_or_else(|| {
            RagError::Generation {
                provider: "Anthropic".into(),
                message: "API returned no content blocks".into(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = AnthropicGenerationProvider::new("").unwrap_err();
        assert!(matches!(err, RagError::Generation { .. }));
    }

    #[test]
    fn builders_override_generation_parameters() {
        let provider = AnthropicGenerationProvider::new("sk-ant-test")
            .unwrap()
            .with_model("claude-sonnet-4-20250514")
            .with_max_tokens(2000)
            .with_temperature(0.0);
        assert_eq!(provider.model, "claude-sonnet-4-20250514");
        assert_eq!(provider.max_tokens, 2000);
        assert_eq!(provider.temperature, 0.0);
    }
}
