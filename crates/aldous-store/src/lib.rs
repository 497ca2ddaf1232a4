//! Document storage for the Aldous tooling.
//!
//! This crate abstracts the document database behind the [`DocumentStore`]
//! trait so the gateway can run against a real `MongoDB` deployment or an
//! isolated in-memory store.
//!
//! # Implementations
//!
//! - [`MongoStore`]: the `mongodb` async driver against one database
//! - [`MemoryStore`]: per-collection vectors behind a mutex, for tests and
//!   dry runs
//!
//! Documents cross this boundary as JSON objects. Generated identifiers are
//! returned, and rendered inside query results, as plain hex strings.
//!
//! # Example
//!
//! ```
//! # async fn example() -> aldous_store::Result<()> {
//! use aldous_core::{Collection, Document, FindSpec};
//! use aldous_store::{DocumentStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let mut profile = Document::new();
//! profile.insert("name".into(), "Jo".into());
//!
//! let id = store.insert_one(Collection::Profiles, profile).await?;
//! let found = store
//!     .find(Collection::Profiles, &Document::new(), &FindSpec::default())
//!     .await?;
//! assert_eq!(found[0]["_id"], id.as_str());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod convert;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod mongo;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use mongo::{MongoOptions, MongoStore};

use aldous_core::{Collection, Document, FindSpec};
use async_trait::async_trait;

/// Outcome of an update-many call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents whose content changed.
    pub modified: u64,
    /// Identifier of the document created by an upsert, if any.
    pub upserted_id: Option<String>,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (`MongoDB`, in-memory for testing).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one document and return its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_one(&self, collection: Collection, document: Document) -> Result<String>;

    /// Insert a batch of documents and return their identifiers in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch operation fails.
    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<Vec<String>>;

    /// Apply an update document to every match, optionally inserting one
    /// document when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the update is rejected.
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Replace the first match with `replacement`, keeping its `_id`.
    /// Fields absent from `replacement` are removed. With `upsert` set and
    /// nothing matching, `replacement` is inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the replacement
    /// contains update operators.
    async fn replace_one(
        &self,
        collection: Collection,
        filter: &Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Return matching documents with `_id` rendered as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find(
        &self,
        collection: Collection,
        filter: &Document,
        spec: &FindSpec,
    ) -> Result<Vec<Document>>;

    /// Delete every match and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_many(&self, collection: Collection, filter: &Document) -> Result<u64>;

    /// Count matching documents exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_documents(&self, collection: Collection, filter: &Document) -> Result<u64>;

    /// Fast, possibly stale count of the whole collection from metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn estimated_document_count(&self, collection: Collection) -> Result<u64>;

    /// Release the underlying connection.
    async fn close(&self);
}
