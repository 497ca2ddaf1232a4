//! Error types for the document gateway.
//!
//! Validation errors are raised before the store is touched. Storage errors
//! name the collection and the operation that failed.

use std::fmt;

use aldous_core::{Collection, SchemaViolation, UnknownCollection, UpdateError};
use aldous_store::StoreError;
use thiserror::Error;

/// A result type using `GatewayError`.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// The gateway operation a storage failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single-document insert.
    Upload,
    /// Update of every matching document.
    Update,
    /// Whole-document replacement of the first match.
    Replace,
    /// Filtered read.
    Query,
    /// Removal of every matching document.
    Delete,
    /// Document counts.
    Stats,
    /// Batch insert.
    BulkUpload,
}

impl Operation {
    /// Lowercase name used in messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Query => "query",
            Self::Delete => "delete",
            Self::Stats => "stats",
            Self::BulkUpload => "bulk upload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The collection name is not one of the recognised five.
    #[error(transparent)]
    UnknownCollection(#[from] UnknownCollection),

    /// A document does not satisfy its collection's rules.
    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),

    /// Caller-supplied text is not the expected JSON shape.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The update expression cannot be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(#[from] UpdateError),

    /// A write was given an empty filter instead of an explicit match-all.
    #[error(
        "refusing to {operation} every document in {collection} with an empty filter; \
         match all documents explicitly"
    )]
    UnscopedFilter {
        /// The target collection.
        collection: Collection,
        /// The refused operation.
        operation: Operation,
    },

    /// The store could not be reached.
    #[error("could not connect to the document store")]
    Connection(#[source] StoreError),

    /// The store failed while running an operation.
    #[error("{operation} on {collection} failed")]
    Storage {
        /// The target collection.
        collection: Collection,
        /// The failed operation.
        operation: Operation,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Connection settings are incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Build a storage error for `operation` on `collection`.
    #[must_use]
    pub const fn storage(collection: Collection, operation: Operation, source: StoreError) -> Self {
        Self::Storage {
            collection,
            operation,
            source,
        }
    }

    /// Process exit status for this error: `2` for caller mistakes, `1` for
    /// failures of the store itself.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownCollection(_)
            | Self::SchemaViolation(_)
            | Self::MalformedInput(_)
            | Self::InvalidUpdate(_)
            | Self::UnscopedFilter { .. }
            | Self::Config(_) => 2,
            Self::Connection(_) | Self::Storage { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(
            GatewayError::from(UnknownCollection("orders".into())).exit_code(),
            2
        );
        assert_eq!(GatewayError::MalformedInput("x".into()).exit_code(), 2);
        assert_eq!(GatewayError::from(UpdateError::Empty).exit_code(), 2);
        assert_eq!(
            GatewayError::UnscopedFilter {
                collection: Collection::Users,
                operation: Operation::Delete,
            }
            .exit_code(),
            2
        );
        assert_eq!(
            GatewayError::storage(
                Collection::Users,
                Operation::Query,
                StoreError::Database("boom".into())
            )
            .exit_code(),
            1
        );
    }

    #[test]
    fn storage_message_names_collection_and_operation() {
        let err = GatewayError::storage(
            Collection::ChatSessions,
            Operation::BulkUpload,
            StoreError::Database("write failed".into()),
        );
        assert_eq!(err.to_string(), "bulk upload on chatsessions failed");
    }

    #[test]
    fn store_cause_is_reported_once_in_the_chain() {
        let errors = [
            GatewayError::storage(
                Collection::Agents,
                Operation::Update,
                StoreError::Database("E11000 duplicate key".into()),
            ),
            GatewayError::Connection(StoreError::Connection("E11000 duplicate key".into())),
        ];
        for err in errors {
            let mut chain = vec![err.to_string()];
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                chain.push(cause.to_string());
                source = cause.source();
            }
            assert_eq!(chain.len(), 2, "{chain:?}");
            assert_eq!(chain.join(": ").matches("E11000").count(), 1, "{chain:?}");
        }
    }
}
