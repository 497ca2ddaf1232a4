//! Refreshing a subject's dashboard assessment.

use aldous_core::document::{timestamp_value, ID_FIELD};
use aldous_core::{Collection, Document, Filter, FindSpec, SortOrder};
use aldous_gateway::DocumentGateway;
use aldous_store::DocumentStore;
use chrono::Utc;
use serde_json::Value;

use crate::assessment::parse_assessment;
use crate::error::{AnalysisError, Result};
use crate::model::CompletionModel;
use crate::prompt::ASSESSMENT_SYSTEM_PROMPT;
use crate::transcript::{format_transcript, message_count};

/// What a refresh wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    /// The subject the assessment describes.
    pub subject_id: String,
    /// Chat sessions included in the transcript.
    pub conversation_count: usize,
    /// Messages included in the transcript.
    pub message_count: usize,
    /// Identifier of the new analysis when none existed before.
    pub created_id: Option<String>,
    /// `executiveSummary.riskLevel` from the assessment, if present.
    pub risk_level: Option<String>,
    /// The assessment as written.
    pub analysis: Document,
}

/// Builds assessments from chat sessions and stores them in `analyses`.
pub struct DashboardUpdater<'a, S: DocumentStore, M: CompletionModel> {
    gateway: &'a DocumentGateway<S>,
    model: M,
}

impl<'a, S: DocumentStore, M: CompletionModel> DashboardUpdater<'a, S, M> {
    /// Create an updater reading and writing through `gateway`.
    #[must_use]
    pub const fn new(gateway: &'a DocumentGateway<S>, model: M) -> Self {
        Self { gateway, model }
    }

    /// Regenerate the assessment for `subject_id`.
    ///
    /// Reads the subject's chat sessions oldest first, asks the model for an
    /// assessment of the full transcript and stores the result in `analyses`,
    /// keyed by `subjectID`. An existing analysis is replaced whole, so
    /// sections missing from the new assessment do not linger.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::NoConversations` if the subject has no
    /// sessions, `Model` or `InvalidResponse` if the completion fails, or
    /// `Gateway` if reading or writing fails.
    pub async fn refresh(&self, subject_id: &str) -> Result<RefreshOutcome> {
        let sessions = self
            .gateway
            .query(
                Collection::ChatSessions.as_str(),
                &Filter::field("subjectID", subject_id),
                &FindSpec::default().sorted("sessionDate", SortOrder::Ascending),
            )
            .await?;
        if sessions.is_empty() {
            return Err(AnalysisError::NoConversations(subject_id.to_string()));
        }

        let transcript = format_transcript(&sessions);
        let messages = message_count(&sessions);
        tracing::info!(
            subject_id = %subject_id,
            sessions = sessions.len(),
            messages,
            "Requesting assessment"
        );

        let completion = self
            .model
            .complete(ASSESSMENT_SYSTEM_PROMPT, &transcript)
            .await?;
        let mut analysis = parse_assessment(&completion)?;

        analysis.remove(ID_FIELD);
        analysis.insert("subjectID".to_string(), Value::String(subject_id.to_string()));
        analysis.insert("conversationCount".to_string(), Value::from(sessions.len()));
        analysis.insert("lastUpdated".to_string(), timestamp_value(Utc::now()));

        let summary = self
            .gateway
            .replace(
                Collection::Analyses.as_str(),
                &Filter::field("subjectID", subject_id),
                analysis.clone(),
                true,
            )
            .await?;

        let risk_level = analysis
            .get("executiveSummary")
            .and_then(|s| s.get("riskLevel"))
            .and_then(Value::as_str)
            .map(str::to_string);

        tracing::info!(
            subject_id = %subject_id,
            created = summary.upserted_id.is_some(),
            risk_level = risk_level.as_deref().unwrap_or("unknown"),
            "Stored assessment"
        );

        Ok(RefreshOutcome {
            subject_id: subject_id.to_string(),
            conversation_count: sessions.len(),
            message_count: messages,
            created_id: summary.upserted_id,
            risk_level,
            analysis,
        })
    }
}
