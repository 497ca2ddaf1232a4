//! Language-model risk assessments for the Aldous dashboard.
//!
//! A refresh reads a subject's chat sessions through the document gateway,
//! renders them as a transcript, asks a completion model for a structured
//! assessment and upserts the result into the `analyses` collection.
//!
//! # Components
//!
//! - [`CompletionModel`]: single-turn completion, implemented over HTTP by
//!   [`AnthropicClient`]
//! - [`transcript`]: sessions to `"{timestamp}: User: ..."` lines
//! - [`assessment`]: the JSON object inside a completion
//! - [`DashboardUpdater`]: the refresh itself

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assessment;
pub mod config;
pub mod error;
pub mod model;
pub mod prompt;
pub mod transcript;
pub mod updater;

pub use assessment::parse_assessment;
pub use config::ModelConfig;
pub use error::{AnalysisError, Result};
pub use model::{AnthropicClient, CompletionModel};
pub use transcript::format_transcript;
pub use updater::{DashboardUpdater, RefreshOutcome};
