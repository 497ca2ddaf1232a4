//! Per-collection document rules.
//!
//! Each collection's rules are a [`CollectionSchema`] record rather than
//! branching code: required fields, closed value sets, defaults injected when
//! a field is absent, and groups of fields of which at least one must be set.
//!
//! Validation never mutates the caller's document. It returns a copy that may
//! carry injected defaults; caller-supplied fields are never removed or
//! renamed.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::collection::Collection;
use crate::document::{is_truthy, timestamp_value, Document};

/// A default applied when a field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// A boolean constant.
    Bool(bool),
    /// An empty ordered sequence.
    EmptyArray,
    /// The time of validation, as an extended-JSON date.
    CurrentTimestamp,
}

impl FieldDefault {
    fn value(self, now: DateTime<Utc>) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::EmptyArray => Value::Array(Vec::new()),
            Self::CurrentTimestamp => timestamp_value(now),
        }
    }
}

/// The rules a document must satisfy before it is written to a collection.
#[derive(Debug)]
pub struct CollectionSchema {
    /// The collection these rules apply to.
    pub collection: Collection,
    /// Fields that must be present (a present `null` counts).
    pub required: &'static [&'static str],
    /// Fields restricted to a closed set of string values.
    pub allowed_values: &'static [(&'static str, &'static [&'static str])],
    /// Fields injected when absent.
    pub defaults: &'static [(&'static str, FieldDefault)],
    /// Groups of fields of which at least one must be present and truthy.
    pub alternatives: &'static [&'static [&'static str]],
}

/// Valid values for `users.userClass`.
pub const USER_CLASSES: &[&str] = &["admin", "superuser", "client"];

static USERS: CollectionSchema = CollectionSchema {
    collection: Collection::Users,
    required: &["username", "userClass"],
    allowed_values: &[("userClass", USER_CLASSES)],
    defaults: &[],
    alternatives: &[],
};

static AGENTS: CollectionSchema = CollectionSchema {
    collection: Collection::Agents,
    required: &["name", "aiModel"],
    allowed_values: &[],
    defaults: &[("activeStatus", FieldDefault::Bool(true))],
    alternatives: &[&["phone", "socialID"]],
};

static PROFILES: CollectionSchema = CollectionSchema {
    collection: Collection::Profiles,
    required: &["name", "country", "phone"],
    allowed_values: &[],
    defaults: &[],
    alternatives: &[],
};

static CHAT_SESSIONS: CollectionSchema = CollectionSchema {
    collection: Collection::ChatSessions,
    required: &["subjectID", "assignedAgentID", "language", "sessionDate"],
    allowed_values: &[],
    defaults: &[("messages", FieldDefault::EmptyArray)],
    alternatives: &[],
};

static ANALYSES: CollectionSchema = CollectionSchema {
    collection: Collection::Analyses,
    required: &["subjectID"],
    allowed_values: &[],
    defaults: &[("lastUpdated", FieldDefault::CurrentTimestamp)],
    alternatives: &[],
};

/// Look up the rules for a collection.
#[must_use]
pub fn schema_for(collection: Collection) -> &'static CollectionSchema {
    match collection {
        Collection::Users => &USERS,
        Collection::Agents => &AGENTS,
        Collection::Profiles => &PROFILES,
        Collection::ChatSessions => &CHAT_SESSIONS,
        Collection::Analyses => &ANALYSES,
    }
}

impl CollectionSchema {
    /// Check `document` against these rules, returning a copy with defaults
    /// injected.
    ///
    /// Checks run in a fixed order: required fields (in declared order),
    /// allowed values, defaults, then at-least-one-of groups.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaViolation`] encountered.
    pub fn apply(
        &self,
        document: &Document,
        now: DateTime<Utc>,
    ) -> Result<Document, SchemaViolation> {
        let collection = self.collection;

        if let Some(field) = self.required.iter().copied().find(|f| !document.contains_key(*f)) {
            return Err(SchemaViolation::MissingField { collection, field });
        }

        for &(field, allowed) in self.allowed_values {
            if let Some(value) = document.get(field) {
                let ok = value.as_str().is_some_and(|s| allowed.contains(&s));
                if !ok {
                    return Err(SchemaViolation::InvalidValue {
                        collection,
                        field,
                        value: render(value),
                        allowed,
                    });
                }
            }
        }

        let mut validated = document.clone();
        for &(field, default) in self.defaults {
            if !validated.contains_key(field) {
                validated.insert(field.to_string(), default.value(now));
            }
        }

        for &fields in self.alternatives {
            let satisfied = fields
                .iter()
                .any(|f| validated.get(*f).is_some_and(is_truthy));
            if !satisfied {
                return Err(SchemaViolation::MissingAlternative { collection, fields });
            }
        }

        Ok(validated)
    }
}

/// Validate a document for `collection` using the current time for
/// timestamp defaults.
///
/// # Errors
///
/// Returns a [`SchemaViolation`] if the document breaks the collection's rules.
pub fn validate(collection: Collection, document: &Document) -> Result<Document, SchemaViolation> {
    schema_for(collection).apply(document, Utc::now())
}

/// Validate a document by collection name.
///
/// Names outside the recognised five have no rules and are passed through
/// unchanged.
///
/// # Errors
///
/// Returns a [`SchemaViolation`] if the document breaks the collection's rules.
pub fn validate_named(name: &str, document: &Document) -> Result<Document, SchemaViolation> {
    match name.parse::<Collection>() {
        Ok(collection) => validate(collection, document),
        Err(_) => Ok(document.clone()),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A document that does not satisfy its collection's rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// A required field is absent.
    #[error("missing required field '{field}' for {collection} collection")]
    MissingField {
        /// The target collection.
        collection: Collection,
        /// The absent field.
        field: &'static str,
    },

    /// A field holds a value outside its closed set.
    #[error(
        "invalid {field} '{value}' for {collection} collection; must be one of: {}",
        allowed.join(", ")
    )]
    InvalidValue {
        /// The target collection.
        collection: Collection,
        /// The offending field.
        field: &'static str,
        /// The rejected value, rendered as text.
        value: String,
        /// The accepted values.
        allowed: &'static [&'static str],
    },

    /// None of a group of alternative fields is set.
    #[error("{collection} document must have at least one of: {}", fields.join(", "))]
    MissingAlternative {
        /// The target collection.
        collection: Collection,
        /// The alternative fields.
        fields: &'static [&'static str],
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn minimal(collection: Collection) -> Document {
        doc(match collection {
            Collection::Users => json!({"username": "john", "userClass": "client"}),
            Collection::Agents => json!({"name": "Guide", "aiModel": "gpt-4o", "phone": "+1"}),
            Collection::Profiles => json!({"name": "Jo", "country": "AU", "phone": "+61"}),
            Collection::ChatSessions => json!({
                "subjectID": "s1",
                "assignedAgentID": "a1",
                "language": "English",
                "sessionDate": "2025-05-29T10:30:00.000Z"
            }),
            Collection::Analyses => json!({"subjectID": "s1"}),
        })
    }

    #[test]
    fn minimal_documents_pass_for_every_collection() {
        for collection in Collection::ALL {
            let result = validate(collection, &minimal(collection));
            assert!(result.is_ok(), "{collection}: {result:?}");
        }
    }

    #[test]
    fn each_required_field_is_enforced() {
        for collection in Collection::ALL {
            for &field in schema_for(collection).required {
                let mut document = minimal(collection);
                document.remove(field);
                assert_eq!(
                    validate(collection, &document),
                    Err(SchemaViolation::MissingField { collection, field }),
                );
            }
        }
    }

    #[test]
    fn present_null_satisfies_required() {
        let document = doc(json!({"subjectID": null}));
        assert!(validate(Collection::Analyses, &document).is_ok());
    }

    #[test]
    fn user_class_must_be_known() {
        let guest = doc(json!({"username": "g", "userClass": "guest"}));
        let err = validate(Collection::Users, &guest).unwrap_err();
        assert!(matches!(
            err,
            SchemaViolation::InvalidValue { field: "userClass", ref value, .. } if value == "guest"
        ));
        assert_eq!(
            err.to_string(),
            "invalid userClass 'guest' for users collection; must be one of: admin, superuser, client"
        );

        for class in USER_CLASSES {
            let user = doc(json!({"username": "u", "userClass": class}));
            assert!(validate(Collection::Users, &user).is_ok());
        }

        let numeric = doc(json!({"username": "u", "userClass": 1}));
        assert!(validate(Collection::Users, &numeric).is_err());
    }

    #[test]
    fn agent_needs_phone_or_social_id() {
        let bare = doc(json!({"name": "Guide", "aiModel": "gpt-4o"}));
        assert_eq!(
            validate(Collection::Agents, &bare),
            Err(SchemaViolation::MissingAlternative {
                collection: Collection::Agents,
                fields: &["phone", "socialID"],
            })
        );

        let empty_phone = doc(json!({"name": "Guide", "aiModel": "gpt-4o", "phone": ""}));
        assert!(validate(Collection::Agents, &empty_phone).is_err());

        let social = doc(json!({"name": "Guide", "aiModel": "gpt-4o", "socialID": "fb-1"}));
        assert!(validate(Collection::Agents, &social).is_ok());
    }

    #[test]
    fn agent_active_status_defaults_to_true() {
        let agent = doc(json!({"name": "Guide", "aiModel": "gpt-4o", "phone": "+1"}));
        let validated = validate(Collection::Agents, &agent).unwrap();
        assert_eq!(validated["activeStatus"], json!(true));
        assert!(!agent.contains_key("activeStatus"), "input must not be mutated");

        let inactive = doc(json!({
            "name": "G",
            "aiModel": "m",
            "phone": "+1",
            "activeStatus": false
        }));
        let validated = validate(Collection::Agents, &inactive).unwrap();
        assert_eq!(validated["activeStatus"], json!(false));
    }

    #[test]
    fn chat_session_messages_default_and_preserved() {
        let session = minimal(Collection::ChatSessions);
        let validated = validate(Collection::ChatSessions, &session).unwrap();
        assert_eq!(validated["messages"], json!([]));

        let mut with_messages = session.clone();
        let messages = json!([
            {"role": "user", "content": "first", "timestamp": "t1"},
            {"role": "agent", "content": "second", "timestamp": "t2"},
            {"role": "user", "content": "third", "timestamp": "t3"}
        ]);
        with_messages.insert("messages".into(), messages.clone());
        let validated = validate(Collection::ChatSessions, &with_messages).unwrap();
        assert_eq!(validated["messages"], messages);
    }

    #[test]
    fn analysis_last_updated_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let validated = schema_for(Collection::Analyses)
            .apply(&minimal(Collection::Analyses), now)
            .unwrap();
        assert_eq!(
            validated["lastUpdated"],
            json!({"$date": "2025-01-02T03:04:05.000Z"})
        );

        let mut supplied = minimal(Collection::Analyses);
        supplied.insert("lastUpdated".into(), json!("05.29.2025"));
        let validated = schema_for(Collection::Analyses).apply(&supplied, now).unwrap();
        assert_eq!(validated["lastUpdated"], json!("05.29.2025"));
    }

    #[test]
    fn extra_fields_are_kept() {
        let mut profile = minimal(Collection::Profiles);
        profile.insert("socialIDs".into(), json!(["a", "b"]));
        let validated = validate(Collection::Profiles, &profile).unwrap();
        assert_eq!(validated, profile);
    }

    #[test]
    fn unknown_name_passes_through() {
        let document = doc(json!({"anything": 1}));
        assert_eq!(validate_named("scratch", &document), Ok(document.clone()));
        assert!(validate_named("users", &document).is_err());
    }
}
