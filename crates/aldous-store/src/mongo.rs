//! `MongoDB` storage implementation.

use std::time::Duration;

use aldous_core::{Collection, Document, FindSpec};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

use crate::convert;
use crate::error::{Result, StoreError};
use crate::{DocumentStore, UpdateOutcome};

/// Connection settings for [`MongoStore::connect`].
#[derive(Debug, Clone)]
pub struct MongoOptions {
    /// Connection string (`mongodb://` or `mongodb+srv://`).
    pub uri: String,
    /// Database holding the collections.
    pub database: String,
    /// Application name reported to the server.
    pub app_name: Option<String>,
    /// Timeout for establishing connections and selecting a server.
    pub connect_timeout: Duration,
}

/// MongoDB-backed storage bound to one database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect and verify the deployment answers a ping.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the URI cannot be parsed or the
    /// server cannot be reached.
    pub async fn connect(options: &MongoOptions) -> Result<Self> {
        let mut client_options = ClientOptions::parse(&options.uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        client_options.app_name.clone_from(&options.app_name);
        client_options.connect_timeout = Some(options.connect_timeout);
        client_options.server_selection_timeout = Some(options.connect_timeout);

        let client = Client::with_options(client_options)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let database = client.database(&options.database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(database = %options.database, "Connected to MongoDB");
        Ok(Self { client, database })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<bson::Document> {
        self.database.collection(collection.as_str())
    }
}

/// Classify a driver error, keeping reachability failures apart.
fn driver_error(e: &mongodb::error::Error) -> StoreError {
    match *e.kind {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            StoreError::Connection(e.to_string())
        }
        ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
            StoreError::Serialization(e.to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: Collection, document: Document) -> Result<String> {
        let document = convert::to_bson(document)?;
        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| driver_error(&e))?;
        Ok(convert::id_to_string(result.inserted_id))
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<Vec<String>> {
        let documents = documents
            .into_iter()
            .map(convert::to_bson)
            .collect::<Result<Vec<_>>>()?;
        let result = self
            .collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| driver_error(&e))?;

        let mut ids: Vec<_> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids
            .into_iter()
            .map(|(_, id)| convert::id_to_string(id))
            .collect())
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        let filter = convert::filter_to_bson(filter)?;
        let update = convert::to_bson(update.clone())?;
        let result = self
            .collection(collection)
            .update_many(filter, update)
            .upsert(upsert)
            .await
            .map_err(|e| driver_error(&e))?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id.map(convert::id_to_string),
        })
    }

    async fn replace_one(
        &self,
        collection: Collection,
        filter: &Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        let filter = convert::filter_to_bson(filter)?;
        let replacement = convert::to_bson(replacement)?;
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .upsert(upsert)
            .await
            .map_err(|e| driver_error(&e))?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id.map(convert::id_to_string),
        })
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Document,
        spec: &FindSpec,
    ) -> Result<Vec<Document>> {
        let filter = convert::filter_to_bson(filter)?;
        let handle = self.collection(collection);
        let mut action = handle.find(filter);
        if let Some(sort) = &spec.sort {
            let mut order = bson::Document::new();
            order.insert(sort.field.clone(), sort.order.as_i32());
            action = action.sort(order);
        }
        if let Some(limit) = spec.effective_limit() {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = action.await.map_err(|e| driver_error(&e))?;
        let documents: Vec<bson::Document> =
            cursor.try_collect().await.map_err(|e| driver_error(&e))?;
        Ok(documents.into_iter().map(convert::from_bson).collect())
    }

    async fn delete_many(&self, collection: Collection, filter: &Document) -> Result<u64> {
        let filter = convert::filter_to_bson(filter)?;
        let result = self
            .collection(collection)
            .delete_many(filter)
            .await
            .map_err(|e| driver_error(&e))?;
        Ok(result.deleted_count)
    }

    async fn count_documents(&self, collection: Collection, filter: &Document) -> Result<u64> {
        let filter = convert::filter_to_bson(filter)?;
        self.collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| driver_error(&e))
    }

    async fn estimated_document_count(&self, collection: Collection) -> Result<u64> {
        self.collection(collection)
            .estimated_document_count()
            .await
            .map_err(|e| driver_error(&e))
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::debug!("Closed MongoDB client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aldous_core::SortOrder;

    /// A store whose client points at a closed port, without the ping
    /// `connect` performs.
    async fn unreachable_store() -> MongoStore {
        let mut options = ClientOptions::parse("mongodb://127.0.0.1:1").await.unwrap();
        options.connect_timeout = Some(Duration::from_millis(200));
        options.server_selection_timeout = Some(Duration::from_millis(200));
        let client = Client::with_options(options).unwrap();
        let database = client.database("aldous_unreachable");
        MongoStore { client, database }
    }

    #[tokio::test]
    async fn sorted_limited_find_reports_connection_error() {
        let store = unreachable_store().await;
        let spec = FindSpec::default()
            .sorted("sessionDate", SortOrder::Ascending)
            .limit(5);
        let result = store
            .find(Collection::ChatSessions, &Document::new(), &spec)
            .await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn replace_reports_connection_error() {
        let store = unreachable_store().await;
        let mut filter = Document::new();
        filter.insert("subjectID".into(), "s1".into());
        let result = store
            .replace_one(Collection::Analyses, &filter, filter.clone(), true)
            .await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
