//! Filters, update expressions and find options.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

/// Which documents an operation applies to.
///
/// Matching every document must be requested explicitly with [`Filter::All`];
/// write operations refuse an empty [`Filter::Matching`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Every document in the collection.
    #[default]
    All,
    /// Documents matching a filter mapping.
    Matching(Document),
}

impl Filter {
    /// Filter on a single field equal to `value`.
    #[must_use]
    pub fn field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut document = Document::new();
        document.insert(name.into(), value.into());
        Self::Matching(document)
    }

    /// The filter mapping sent to the store.
    #[must_use]
    pub fn to_document(&self) -> Document {
        match self {
            Self::All => Document::new(),
            Self::Matching(document) => document.clone(),
        }
    }

    /// True for a `Matching` filter with no conditions, which would silently
    /// match everything.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        matches!(self, Self::Matching(document) if document.is_empty())
    }
}

/// How an update payload should be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateExpr {
    /// Assign these fields, leaving the others untouched.
    SetFields(Document),
    /// Operator directives (`$set`, `$inc`, ...) passed to the store as-is.
    RawOperators(Document),
}

impl UpdateExpr {
    /// Choose a variant from the key-prefix convention: any `$`-prefixed key
    /// means operator directives, otherwise plain field assignments.
    #[must_use]
    pub fn infer(document: Document) -> Self {
        if document.keys().any(|k| k.starts_with('$')) {
            Self::RawOperators(document)
        } else {
            Self::SetFields(document)
        }
    }

    /// Render the update document understood by the store.
    ///
    /// # Errors
    ///
    /// Returns an [`UpdateError`] if the expression is empty or its keys
    /// contradict its variant.
    pub fn into_document(self) -> Result<Document, UpdateError> {
        match self {
            Self::SetFields(fields) => {
                if fields.is_empty() {
                    return Err(UpdateError::Empty);
                }
                if let Some(key) = fields.keys().find(|k| k.starts_with('$')) {
                    return Err(UpdateError::OperatorInFields(key.clone()));
                }
                let mut update = Document::new();
                update.insert("$set".to_string(), Value::Object(fields));
                Ok(update)
            }
            Self::RawOperators(operators) => {
                if operators.is_empty() {
                    return Err(UpdateError::Empty);
                }
                if let Some(key) = operators.keys().find(|k| !k.starts_with('$')) {
                    return Err(UpdateError::FieldInOperators(key.clone()));
                }
                Ok(operators)
            }
        }
    }
}

/// An update expression that cannot be sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The expression has no fields or operators.
    #[error("update has no fields")]
    Empty,

    /// A plain-field update contains an operator-style key.
    #[error("field '{0}' looks like an update operator; send operator updates explicitly")]
    OperatorInFields(String),

    /// An operator update contains a plain field name.
    #[error("'{0}' is not an update operator")]
    FieldInOperators(String),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

impl SortOrder {
    /// The direction as a document-store sort value (`1` or `-1`).
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// Sort on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by (dotted paths allowed).
    pub field: String,
    /// Direction.
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    /// Sort on `field` in the given direction.
    #[must_use]
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// Options for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindSpec {
    /// Maximum number of documents; `0` means unbounded.
    #[serde(default)]
    pub limit: u64,
    /// Optional sort. Without one, order is whatever the store returns.
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl FindSpec {
    /// Return at most `limit` documents (`0` for no limit).
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sort the results.
    #[must_use]
    pub fn sorted(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(SortSpec::new(field, order));
        self
    }

    /// The limit as an option, `None` when unbounded.
    #[must_use]
    pub const fn effective_limit(&self) -> Option<u64> {
        if self.limit == 0 {
            None
        } else {
            Some(self.limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn set_fields_wraps_in_set() {
        let update = UpdateExpr::SetFields(doc(json!({"activeStatus": false})))
            .into_document()
            .unwrap();
        assert_eq!(Value::Object(update), json!({"$set": {"activeStatus": false}}));
    }

    #[test]
    fn raw_operators_pass_through() {
        let ops = doc(json!({"$inc": {"count": 1}, "$unset": {"old": ""}}));
        let update = UpdateExpr::RawOperators(ops.clone()).into_document().unwrap();
        assert_eq!(update, ops);
    }

    #[test]
    fn mixed_keys_rejected() {
        let err = UpdateExpr::SetFields(doc(json!({"name": "x", "$inc": {"n": 1}})))
            .into_document()
            .unwrap_err();
        assert_eq!(err, UpdateError::OperatorInFields("$inc".into()));

        let err = UpdateExpr::RawOperators(doc(json!({"$set": {"a": 1}, "name": "x"})))
            .into_document()
            .unwrap_err();
        assert_eq!(err, UpdateError::FieldInOperators("name".into()));
    }

    #[test]
    fn empty_update_rejected() {
        assert_eq!(
            UpdateExpr::SetFields(Document::new()).into_document(),
            Err(UpdateError::Empty)
        );
        assert_eq!(
            UpdateExpr::RawOperators(Document::new()).into_document(),
            Err(UpdateError::Empty)
        );
    }

    #[test]
    fn infer_uses_key_prefix() {
        assert!(matches!(
            UpdateExpr::infer(doc(json!({"a": 1}))),
            UpdateExpr::SetFields(_)
        ));
        assert!(matches!(
            UpdateExpr::infer(doc(json!({"$set": {"a": 1}}))),
            UpdateExpr::RawOperators(_)
        ));
    }

    #[test]
    fn unscoped_filter_detection() {
        assert!(!Filter::All.is_unscoped());
        assert!(Filter::Matching(Document::new()).is_unscoped());
        assert!(!Filter::field("name", "x").is_unscoped());
        assert_eq!(Filter::All.to_document(), Document::new());
    }

    #[test]
    fn find_spec_defaults() {
        let spec = FindSpec::default();
        assert_eq!(spec.effective_limit(), None);
        assert!(spec.sort.is_none());
        assert_eq!(SortOrder::default(), SortOrder::Descending);

        let spec = FindSpec::default().limit(2).sorted("name", SortOrder::Ascending);
        assert_eq!(spec.effective_limit(), Some(2));
        assert_eq!(spec.sort.unwrap().order.as_i32(), 1);
    }
}
