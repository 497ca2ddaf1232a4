//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached or the client could not be built.
    #[error("connection error: {0}")]
    Connection(String),

    /// A database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A document could not be converted to or from the wire format.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store refused the request (unsupported operator, bad filter).
    #[error("request rejected: {0}")]
    Rejected(String),
}
