//! Document representation and value helpers.
//!
//! Documents are JSON objects. The database-assigned identifier lives under
//! [`ID_FIELD`] and is always rendered as a plain string once it leaves the
//! store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A document: a mapping from field names to JSON-compatible values.
pub type Document = Map<String, Value>;

/// Field holding the store-generated identifier.
pub const ID_FIELD: &str = "_id";

/// Whether a value counts as "set" for at-least-one-of rules.
///
/// `null`, `false`, zero, the empty string and empty containers are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a timestamp as an extended-JSON date so document stores persist a
/// native date rather than a string.
#[must_use]
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    let mut date = Map::new();
    date.insert(
        "$date".to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Value::Object(date)
}

/// Copy of `document` without its identifier field.
#[must_use]
pub fn without_id(document: &Document) -> Document {
    let mut copy = document.clone();
    copy.remove(ID_FIELD);
    copy
}
