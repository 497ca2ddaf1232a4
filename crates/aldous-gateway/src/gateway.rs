//! The document gateway.
//!
//! Every operation validates the collection name before touching the store,
//! and every insert validates the document against its collection's rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use aldous_core::{
    schema, Collection, Document, Filter, FindSpec, SchemaViolation, UnknownCollection,
    UpdateExpr,
};
use aldous_store::{DocumentStore, MongoStore, UpdateOutcome};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Operation, Result};

/// Result of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents whose content changed. Zero when an upsert inserted.
    pub modified: u64,
    /// Identifier of the document created by an upsert, if any.
    pub upserted_id: Option<String>,
}

impl From<UpdateOutcome> for UpdateSummary {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            matched: outcome.matched,
            modified: outcome.modified,
            upserted_id: outcome.upserted_id,
        }
    }
}

/// Document counts for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Count from a full scan of the collection.
    pub exact_count: u64,
    /// Fast count from collection metadata; may lag behind.
    pub estimated_count: u64,
}

/// Schema-validated access to the five collections.
///
/// The gateway owns its store handle. Release it with
/// [`DocumentGateway::close`], which consumes the gateway.
pub struct DocumentGateway<S: DocumentStore> {
    store: Arc<S>,
}

impl DocumentGateway<MongoStore> {
    /// Connect to `MongoDB` using `config`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if the connection settings are
    /// incomplete, or `GatewayError::Connection` if the server cannot be
    /// reached.
    pub async fn connect(config: &GatewayConfig) -> Result<Self> {
        let options = config.mongo_options()?;
        let store = MongoStore::connect(&options)
            .await
            .map_err(GatewayError::Connection)?;
        Ok(Self::new(Arc::new(store)))
    }
}

impl<S: DocumentStore> DocumentGateway<S> {
    /// Create a gateway over an existing store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check that `name` is one of the recognised collections.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCollection`] for any other name.
    pub fn validate_collection(name: &str) -> std::result::Result<Collection, UnknownCollection> {
        name.parse()
    }

    /// Check `document` against the rules for `name`, returning a copy with
    /// defaults injected. Names without rules pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaViolation`] found.
    pub fn validate_document(
        name: &str,
        document: &Document,
    ) -> std::result::Result<Document, SchemaViolation> {
        schema::validate_named(name, document)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validate and insert one document, returning its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` or `SchemaViolation` without touching the
    /// store, or `Storage` if the insert fails.
    pub async fn upload(&self, name: &str, document: Document) -> Result<String> {
        let collection = Self::validate_collection(name)?;
        let validated = schema::validate(collection, &document)?;

        let id = self
            .store
            .insert_one(collection, validated)
            .await
            .map_err(|e| GatewayError::storage(collection, Operation::Upload, e))?;

        tracing::info!(collection = %collection, id = %id, "Uploaded document");
        Ok(id)
    }

    /// Apply `update` to every document matching `filter`.
    ///
    /// With `upsert` set and nothing matching, exactly one document is
    /// created. The payload is not checked against the collection's rules.
    ///
    /// # Errors
    ///
    /// Returns `UnscopedFilter` for an empty `Filter::Matching`,
    /// `InvalidUpdate` for an empty or inconsistent expression, or `Storage`
    /// if the update fails.
    pub async fn update(
        &self,
        name: &str,
        filter: &Filter,
        update: UpdateExpr,
        upsert: bool,
    ) -> Result<UpdateSummary> {
        let collection = Self::validate_collection(name)?;
        Self::ensure_scoped(collection, filter, Operation::Update)?;
        let update = update.into_document()?;

        let outcome = self
            .store
            .update_many(collection, &filter.to_document(), &update, upsert)
            .await
            .map_err(|e| GatewayError::storage(collection, Operation::Update, e))?;

        tracing::info!(
            collection = %collection,
            matched = outcome.matched,
            modified = outcome.modified,
            upserted = outcome.upserted_id.is_some(),
            "Updated documents"
        );
        Ok(outcome.into())
    }

    /// Replace the first document matching `filter` with a validated copy of
    /// `document`. Fields the old document had and `document` lacks are
    /// gone afterwards; the stored `_id` is kept.
    ///
    /// With `upsert` set and nothing matching, `document` is inserted.
    ///
    /// # Errors
    ///
    /// Returns `UnscopedFilter` for an empty `Filter::Matching`,
    /// `SchemaViolation` without touching the store, or `Storage` if the
    /// replacement fails.
    pub async fn replace(
        &self,
        name: &str,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> Result<UpdateSummary> {
        let collection = Self::validate_collection(name)?;
        Self::ensure_scoped(collection, filter, Operation::Replace)?;
        let validated = schema::validate(collection, &document)?;

        let outcome = self
            .store
            .replace_one(collection, &filter.to_document(), validated, upsert)
            .await
            .map_err(|e| GatewayError::storage(collection, Operation::Replace, e))?;

        tracing::info!(
            collection = %collection,
            matched = outcome.matched,
            upserted = outcome.upserted_id.is_some(),
            "Replaced document"
        );
        Ok(outcome.into())
    }

    /// Remove every document matching `filter`, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns `UnscopedFilter` for an empty `Filter::Matching`, or `Storage`
    /// if the delete fails.
    pub async fn delete(&self, name: &str, filter: &Filter) -> Result<u64> {
        let collection = Self::validate_collection(name)?;
        Self::ensure_scoped(collection, filter, Operation::Delete)?;

        let deleted = self
            .store
            .delete_many(collection, &filter.to_document())
            .await
            .map_err(|e| GatewayError::storage(collection, Operation::Delete, e))?;

        if matches!(filter, Filter::All) {
            tracing::warn!(collection = %collection, deleted, "Deleted every document");
        } else {
            tracing::info!(collection = %collection, deleted, "Deleted documents");
        }
        Ok(deleted)
    }

    /// Validate each document independently and insert the survivors in one
    /// batch.
    ///
    /// Invalid documents are skipped with a warning naming their 1-based
    /// position. Returns the identifiers of the inserted documents in input
    /// order; when nothing survives the store is not called.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` before looking at any document, or
    /// `Storage` if the batch insert fails.
    pub async fn bulk_upload(&self, name: &str, documents: Vec<Document>) -> Result<Vec<String>> {
        let collection = Self::validate_collection(name)?;
        let total = documents.len();

        let mut valid = Vec::with_capacity(total);
        for (index, document) in documents.iter().enumerate() {
            match schema::validate(collection, document) {
                Ok(validated) => valid.push(validated),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        position = index + 1,
                        error = %e,
                        "Skipping invalid document"
                    );
                }
            }
        }

        if valid.is_empty() {
            tracing::warn!(collection = %collection, total, "No valid documents to upload");
            return Ok(Vec::new());
        }

        let ids = self
            .store
            .insert_many(collection, valid)
            .await
            .map_err(|e| GatewayError::storage(collection, Operation::BulkUpload, e))?;

        tracing::info!(
            collection = %collection,
            inserted = ids.len(),
            skipped = total - ids.len(),
            "Bulk uploaded documents"
        );
        Ok(ids)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Find documents matching `filter`, with `_id` rendered as a string.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection`, or `Storage` if the query fails.
    pub async fn query(
        &self,
        name: &str,
        filter: &Filter,
        spec: &FindSpec,
    ) -> Result<Vec<Document>> {
        let collection = Self::validate_collection(name)?;

        let documents = self
            .store
            .find(collection, &filter.to_document(), spec)
            .await
            .map_err(|e| GatewayError::storage(collection, Operation::Query, e))?;

        tracing::debug!(collection = %collection, found = documents.len(), "Queried documents");
        Ok(documents)
    }

    /// Exact and estimated counts for one collection, or all five in name
    /// order when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection`, or `Storage` if a count fails.
    pub async fn stats(&self, name: Option<&str>) -> Result<BTreeMap<Collection, CollectionStats>> {
        let targets = match name {
            Some(name) => vec![Self::validate_collection(name)?],
            None => Collection::ALL.to_vec(),
        };

        let mut stats = BTreeMap::new();
        for collection in targets {
            let storage = |e| GatewayError::storage(collection, Operation::Stats, e);
            let exact_count = self
                .store
                .count_documents(collection, &Document::new())
                .await
                .map_err(storage)?;
            let estimated_count = self
                .store
                .estimated_document_count(collection)
                .await
                .map_err(storage)?;
            stats.insert(
                collection,
                CollectionStats {
                    exact_count,
                    estimated_count,
                },
            );
        }
        Ok(stats)
    }

    /// Release the store connection.
    pub async fn close(self) {
        self.store.close().await;
        tracing::debug!("Gateway closed");
    }

    fn ensure_scoped(collection: Collection, filter: &Filter, operation: Operation) -> Result<()> {
        if filter.is_unscoped() {
            return Err(GatewayError::UnscopedFilter {
                collection,
                operation,
            });
        }
        Ok(())
    }
}
