//! Completion-model configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the completion service.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// API key sent as `x-api-key`.
    #[serde(default)]
    pub api_key: String,

    /// Model identifier.
    #[serde(default = "ModelConfig::default_model")]
    pub model: String,

    /// Upper bound on generated tokens.
    #[serde(default = "ModelConfig::default_max_tokens")]
    pub max_tokens: u32,

    /// Service root, without the `/v1/messages` path.
    #[serde(default = "ModelConfig::default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "ModelConfig::default_timeout")]
    pub timeout_seconds: u64,
}

impl ModelConfig {
    fn default_model() -> String {
        "claude-3-7-sonnet-20250219".to_string()
    }

    const fn default_max_tokens() -> u32 {
        8192
    }

    fn default_base_url() -> String {
        "https://api.anthropic.com".to_string()
    }

    const fn default_timeout() -> u64 {
        300 // long assessments take minutes
    }

    /// Default settings with the given API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: Self::default_model(),
            max_tokens: Self::default_max_tokens(),
            base_url: Self::default_base_url(),
            timeout_seconds: Self::default_timeout(),
        }
    }
}
