//! Parsing of caller-supplied JSON text into documents.

use std::path::Path;

use aldous_core::Document;
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Parse text that must hold a single JSON object.
///
/// # Errors
///
/// Returns `GatewayError::MalformedInput` if the text is not valid JSON or
/// is not an object.
pub fn parse_document(text: &str) -> Result<Document> {
    match parse_value(text)? {
        Value::Object(document) => Ok(document),
        other => Err(GatewayError::MalformedInput(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

/// Parse text holding either one JSON object or an array of objects.
///
/// # Errors
///
/// Returns `GatewayError::MalformedInput` if the text is not valid JSON, is
/// neither an object nor an array, or an array element is not an object.
pub fn parse_documents(text: &str) -> Result<Vec<Document>> {
    match parse_value(text)? {
        Value::Object(document) => Ok(vec![document]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(document) => Ok(document),
                other => Err(GatewayError::MalformedInput(format!(
                    "item {} is {}, expected a JSON object",
                    index + 1,
                    kind(&other)
                ))),
            })
            .collect(),
        other => Err(GatewayError::MalformedInput(format!(
            "expected a JSON object or array, got {}",
            kind(&other)
        ))),
    }
}

/// Read a file of documents for bulk upload.
///
/// # Errors
///
/// Returns `GatewayError::MalformedInput` if the file cannot be read or its
/// content is not accepted by [`parse_documents`].
pub async fn read_documents_file(path: &Path) -> Result<Vec<Document>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        GatewayError::MalformedInput(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_documents(&text)
}

fn parse_value(text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| GatewayError::MalformedInput(format!("invalid JSON: {e}")))
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
