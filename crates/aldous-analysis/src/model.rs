//! Completion-model client.
//!
//! This module provides the `CompletionModel` trait and an HTTP client for
//! the Anthropic Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{AnalysisError, Result};

/// API version sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Trait for single-turn text completion.
///
/// This trait abstracts the model client, allowing for scripted
/// implementations in tests.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Complete `user` under the `system` instructions and return the text.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Model` if the request fails or the service
    /// rejects it.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// HTTP client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    config: ModelConfig,
}

impl AnthropicClient {
    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Config` if no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AnalysisError::Config(
                "no API key for the completion service".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AnalysisError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

/// Request body for the messages endpoint.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Successful response from the messages endpoint.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Error response from the messages endpoint.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl CompletionModel for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages: [Message {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("service returned status {status}"));

            tracing::error!(status = %status, error = %error, "Completion request failed");
            return Err(AnalysisError::Model(error));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Model(format!("unreadable response: {e}")))?;

        let text: String = body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        tracing::debug!(model = %self.config.model, chars = text.len(), "Received completion");
        Ok(text)
    }
}
