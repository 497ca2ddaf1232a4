//! Error types for dashboard refreshes.

use aldous_gateway::GatewayError;
use thiserror::Error;

/// A result type using `AnalysisError`.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while producing an assessment.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Reading conversations or writing the assessment failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The completion service could not be reached or returned an error.
    #[error("model request failed: {0}")]
    Model(String),

    /// The completion did not contain a JSON object.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    /// The subject has no chat sessions to analyse.
    #[error("no conversations found for subject {0}")]
    NoConversations(String),

    /// Model settings are incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Process exit status for this error, following the gateway's
    /// convention: `2` for caller mistakes, `1` for everything else.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Gateway(e) => e.exit_code(),
            Self::NoConversations(_) | Self::Config(_) => 2,
            Self::Model(_) | Self::InvalidResponse(_) => 1,
        }
    }
}
