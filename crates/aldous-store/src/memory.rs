//! In-memory storage implementation.
//!
//! Each collection is a vector of documents in insertion order, which is the
//! order returned when no sort is requested. Identifiers are generated in the
//! same 24-hex-digit format `MongoDB` uses.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use aldous_core::document::ID_FIELD;
use aldous_core::{Collection, Document, FindSpec, SortOrder};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::matcher;
use crate::{DocumentStore, UpdateOutcome};

/// Memory-backed storage, isolated per instance.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Document>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`DocumentStore::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of documents currently held for `collection`.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .get(&collection)
            .map_or(0, Vec::len)
    }

    /// True if no collection holds any document.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.lock().values().all(Vec::is_empty)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Connection("store is closed".to_string()));
        }
        Ok(())
    }

    /// Give `document` an identifier if it lacks one and return it as text.
    fn assign_id(document: &mut Document) -> String {
        match document.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => {
                let id = ObjectId::new().to_hex();
                document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        }
    }

    /// Refuse `incoming` if any `_id` is already stored or repeats within it.
    fn ensure_unique_ids(existing: &[Document], incoming: &[Document]) -> Result<()> {
        let mut seen: HashSet<String> = existing
            .iter()
            .filter_map(|document| document.get(ID_FIELD))
            .map(Value::to_string)
            .collect();
        for document in incoming {
            if let Some(id) = document.get(ID_FIELD) {
                if !seen.insert(id.to_string()) {
                    return Err(StoreError::Database(format!(
                        "E11000 duplicate key error: {ID_FIELD} {id}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: Collection, mut document: Document) -> Result<String> {
        self.ensure_open()?;
        let id = Self::assign_id(&mut document);
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection).or_default();
        Self::ensure_unique_ids(documents, std::slice::from_ref(&document))?;
        documents.push(document);
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<Vec<String>> {
        self.ensure_open()?;
        let mut prepared = Vec::with_capacity(documents.len());
        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            ids.push(Self::assign_id(&mut document));
            prepared.push(document);
        }
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection).or_default();
        Self::ensure_unique_ids(documents, &prepared)?;
        documents.extend(prepared);
        Ok(ids)
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        self.ensure_open()?;
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection).or_default();

        // Compute every change before committing any, so a rejected operator
        // leaves the collection untouched.
        let mut changes = Vec::new();
        for (index, document) in documents.iter().enumerate() {
            if matcher::matches(document, filter)? {
                let mut updated = document.clone();
                matcher::apply_update(&mut updated, update, false)?;
                changes.push((index, updated));
            }
        }

        let mut outcome = UpdateOutcome {
            matched: changes.len() as u64,
            ..UpdateOutcome::default()
        };

        if changes.is_empty() && upsert {
            let mut created = matcher::seed_from_filter(filter)?;
            matcher::apply_update(&mut created, update, true)?;
            outcome.upserted_id = Some(Self::assign_id(&mut created));
            Self::ensure_unique_ids(documents, std::slice::from_ref(&created))?;
            documents.push(created);
            return Ok(outcome);
        }

        for (index, updated) in changes {
            if documents[index] != updated {
                documents[index] = updated;
                outcome.modified += 1;
            }
        }
        Ok(outcome)
    }

    async fn replace_one(
        &self,
        collection: Collection,
        filter: &Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        self.ensure_open()?;
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection).or_default();

        let mut target = None;
        for (index, document) in documents.iter().enumerate() {
            if matcher::matches(document, filter)? {
                target = Some(index);
                break;
            }
        }

        match target {
            Some(index) => {
                let replaced = matcher::replace_document(Some(&documents[index]), replacement)?;
                let modified = documents[index] != replaced;
                if modified {
                    documents[index] = replaced;
                }
                Ok(UpdateOutcome {
                    matched: 1,
                    modified: u64::from(modified),
                    upserted_id: None,
                })
            }
            None if upsert => {
                let mut created = matcher::replace_document(None, replacement)?;
                let id = Self::assign_id(&mut created);
                Self::ensure_unique_ids(documents, std::slice::from_ref(&created))?;
                documents.push(created);
                Ok(UpdateOutcome {
                    upserted_id: Some(id),
                    ..UpdateOutcome::default()
                })
            }
            None => Ok(UpdateOutcome::default()),
        }
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Document,
        spec: &FindSpec,
    ) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let collections = self.collections.lock();
        let mut found = Vec::new();
        for document in collections.get(&collection).into_iter().flatten() {
            if matcher::matches(document, filter)? {
                found.push(document.clone());
            }
        }
        drop(collections);

        if let Some(sort) = &spec.sort {
            found.sort_by(|a, b| {
                let ordering = matcher::compare_values(
                    matcher::lookup(a, &sort.field),
                    matcher::lookup(b, &sort.field),
                );
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = spec.effective_limit() {
            found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(found)
    }

    async fn delete_many(&self, collection: Collection, filter: &Document) -> Result<u64> {
        self.ensure_open()?;
        let mut collections = self.collections.lock();
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let mut keep = Vec::with_capacity(documents.len());
        let mut deleted = 0u64;
        for document in documents.drain(..) {
            if matcher::matches(&document, filter)? {
                deleted += 1;
            } else {
                keep.push(document);
            }
        }
        *documents = keep;
        Ok(deleted)
    }

    async fn count_documents(&self, collection: Collection, filter: &Document) -> Result<u64> {
        self.ensure_open()?;
        let collections = self.collections.lock();
        let mut count = 0u64;
        for document in collections.get(&collection).into_iter().flatten() {
            if matcher::matches(document, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn estimated_document_count(&self, collection: Collection) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.len(collection) as u64)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("Closed in-memory store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_object_id_hex() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Profiles, doc(json!({"name": "Jo"})))
            .await
            .unwrap();
        assert_eq!(id.len(), 24);
        assert!(ObjectId::parse_str(&id).is_ok());
        assert_eq!(store.len(Collection::Profiles), 1);
    }

    #[tokio::test]
    async fn insert_many_keeps_order() {
        let store = MemoryStore::new();
        let ids = store
            .insert_many(
                Collection::Users,
                vec![doc(json!({"n": 1})), doc(json!({"n": 2})), doc(json!({"n": 3}))],
            )
            .await
            .unwrap();
        let found = store
            .find(Collection::Users, &Document::new(), &FindSpec::default())
            .await
            .unwrap();
        let found_ids: Vec<_> = found.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(found_ids, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn find_sorts_and_limits() {
        let store = MemoryStore::new();
        for n in [3, 1, 4, 2] {
            store
                .insert_one(Collection::Agents, doc(json!({"rank": n})))
                .await
                .unwrap();
        }
        let ranks = |docs: Vec<Document>| {
            docs.iter()
                .map(|d| d["rank"].clone())
                .collect::<Vec<_>>()
        };

        let asc = FindSpec::default().sorted("rank", SortOrder::Ascending);
        let found = store
            .find(Collection::Agents, &Document::new(), &asc)
            .await
            .unwrap();
        assert_eq!(ranks(found), vec![json!(1), json!(2), json!(3), json!(4)]);

        let desc = FindSpec::default()
            .sorted("rank", SortOrder::Descending)
            .limit(2);
        let found = store
            .find(Collection::Agents, &Document::new(), &desc)
            .await
            .unwrap();
        assert_eq!(ranks(found), vec![json!(4), json!(3)]);
    }

    #[tokio::test]
    async fn update_counts_only_real_changes() {
        let store = MemoryStore::new();
        store
            .insert_many(
                Collection::Agents,
                vec![doc(json!({"on": true})), doc(json!({"on": false}))],
            )
            .await
            .unwrap();
        let outcome = store
            .update_many(
                Collection::Agents,
                &Document::new(),
                &doc(json!({"$set": {"on": false}})),
                false,
            )
            .await
            .unwrap();
        assert_eq!(outcome.matched, 2);
        assert_eq!(outcome.modified, 1);
        assert!(outcome.upserted_id.is_none());
    }

    #[tokio::test]
    async fn upsert_creates_from_filter() {
        let store = MemoryStore::new();
        let outcome = store
            .update_many(
                Collection::Analyses,
                &doc(json!({"subjectID": "s1"})),
                &doc(json!({"$set": {"risk": "LOW"}})),
                true,
            )
            .await
            .unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.modified, 0);
        let id = outcome.upserted_id.unwrap();

        let found = store
            .find(Collection::Analyses, &Document::new(), &FindSpec::default())
            .await
            .unwrap();
        assert_eq!(
            Value::Object(found[0].clone()),
            json!({"_id": id, "subjectID": "s1", "risk": "LOW"})
        );
    }

    #[tokio::test]
    async fn rejected_update_changes_nothing() {
        let store = MemoryStore::new();
        store
            .insert_many(
                Collection::Users,
                vec![doc(json!({"n": 1})), doc(json!({"n": "two"}))],
            )
            .await
            .unwrap();
        let result = store
            .update_many(
                Collection::Users,
                &Document::new(),
                &doc(json!({"$inc": {"n": 1}})),
                false,
            )
            .await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));

        let found = store
            .find(Collection::Users, &doc(json!({"n": 1})), &FindSpec::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn delete_and_counts() {
        let store = MemoryStore::new();
        store
            .insert_many(
                Collection::Profiles,
                vec![
                    doc(json!({"c": "AU"})),
                    doc(json!({"c": "NZ"})),
                    doc(json!({"c": "AU"})),
                ],
            )
            .await
            .unwrap();
        assert_eq!(
            store
                .count_documents(Collection::Profiles, &doc(json!({"c": "AU"})))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .delete_many(Collection::Profiles, &doc(json!({"c": "AU"})))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .estimated_document_count(Collection::Profiles)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .delete_many(Collection::Users, &Document::new())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Users, doc(json!({"_id": "u1", "n": 1})))
            .await
            .unwrap();

        let result = store
            .insert_one(Collection::Users, doc(json!({"_id": "u1", "n": 2})))
            .await;
        assert!(matches!(result, Err(StoreError::Database(ref m)) if m.contains("E11000")));

        let result = store
            .insert_many(
                Collection::Users,
                vec![doc(json!({"_id": "u2"})), doc(json!({"_id": "u2"}))],
            )
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.len(Collection::Users), 1);

        // The same id is fine in another collection.
        store
            .insert_one(Collection::Agents, doc(json!({"_id": "u1"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replace_drops_absent_fields_and_upserts() {
        let store = MemoryStore::new();
        let filter = doc(json!({"subjectID": "s1"}));
        let outcome = store
            .replace_one(
                Collection::Analyses,
                &filter,
                doc(json!({"subjectID": "s1", "old": true})),
                true,
            )
            .await
            .unwrap();
        let id = outcome.upserted_id.unwrap();

        let outcome = store
            .replace_one(
                Collection::Analyses,
                &filter,
                doc(json!({"subjectID": "s1", "new": true})),
                true,
            )
            .await
            .unwrap();
        assert_eq!((outcome.matched, outcome.modified), (1, 1));
        assert!(outcome.upserted_id.is_none());

        let found = store
            .find(Collection::Analyses, &Document::new(), &FindSpec::default())
            .await
            .unwrap();
        assert_eq!(
            Value::Object(found[0].clone()),
            json!({"_id": id, "subjectID": "s1", "new": true})
        );

        let outcome = store
            .replace_one(Collection::Analyses, &doc(json!({"subjectID": "s2"})), filter, false)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(store.len(Collection::Analyses), 1);
    }

    #[tokio::test]
    async fn closed_store_refuses_operations() {
        let store = MemoryStore::new();
        store.close().await;
        assert!(store.is_closed());
        let result = store.insert_one(Collection::Users, Document::new()).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
