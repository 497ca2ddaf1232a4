//! Extracting the assessment object from a model completion.

use aldous_core::Document;
use serde_json::Value;

use crate::error::{AnalysisError, Result};

/// Remove Markdown code-fence lines such as "```json" and "```".
fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse the JSON object in a completion.
///
/// Accepts bare JSON, JSON inside a code fence, and JSON surrounded by prose;
/// in the last case the text between the first `{` and the last `}` is used.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidResponse` if no JSON object can be read.
pub fn parse_assessment(text: &str) -> Result<Document> {
    let body = strip_fences(text);
    let body = body.trim();

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(AnalysisError::InvalidResponse(
                    "no JSON object in completion".to_string(),
                ));
            };
            if end < start {
                return Err(AnalysisError::InvalidResponse(
                    "no JSON object in completion".to_string(),
                ));
            }
            serde_json::from_str(&body[start..=end])
                .map_err(|e| AnalysisError::InvalidResponse(format!("invalid JSON: {e}")))?
        }
    };

    match value {
        Value::Object(document) => Ok(document),
        _ => Err(AnalysisError::InvalidResponse(
            "completion is JSON but not an object".to_string(),
        )),
    }
}
