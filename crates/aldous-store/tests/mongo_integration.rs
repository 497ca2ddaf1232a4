//! Integration tests against a real MongoDB deployment.
//!
//! These tests require `ALDOUS_TEST_MONGODB_URI` to point at a deployment
//! the tests may write to. Each run uses a fresh database name.
//!
//! Run with:
//!   ALDOUS_TEST_MONGODB_URI=mongodb://localhost:27017 \
//!     cargo test -p aldous-store --test mongo_integration -- --ignored

use std::time::Duration;

use aldous_core::{Collection, Document, FindSpec, SortOrder};
use aldous_store::{DocumentStore, MongoOptions, MongoStore, StoreError};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};

async fn connect() -> MongoStore {
    let uri = std::env::var("ALDOUS_TEST_MONGODB_URI")
        .expect("ALDOUS_TEST_MONGODB_URI must be set for integration tests");
    let options = MongoOptions {
        uri,
        database: format!("aldous_test_{}", ObjectId::new().to_hex()),
        app_name: Some("aldous-store-tests".to_string()),
        connect_timeout: Duration::from_secs(5),
    };
    MongoStore::connect(&options).await.expect("connect")
}

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
#[ignore = "requires ALDOUS_TEST_MONGODB_URI"]
async fn insert_find_roundtrip_renders_string_ids() {
    let store = connect().await;
    let id = store
        .insert_one(Collection::Profiles, doc(json!({"name": "Jo", "age": 30})))
        .await
        .unwrap();
    assert!(ObjectId::parse_str(&id).is_ok());

    let found = store
        .find(
            Collection::Profiles,
            &doc(json!({"_id": id.clone()})),
            &FindSpec::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["_id"], json!(id));
    assert_eq!(found[0]["age"], json!(30));

    store.delete_many(Collection::Profiles, &Document::new()).await.unwrap();
    store.close().await;
}

#[tokio::test]
#[ignore = "requires ALDOUS_TEST_MONGODB_URI"]
async fn replace_upserts_then_drops_absent_fields() {
    let store = connect().await;
    let filter = doc(json!({"subjectID": "s1"}));
    let created = store
        .replace_one(
            Collection::Analyses,
            &filter,
            doc(json!({"subjectID": "s1", "keyInflectionPoints": ["old"]})),
            true,
        )
        .await
        .unwrap();
    let id = created.upserted_id.unwrap();

    let replaced = store
        .replace_one(
            Collection::Analyses,
            &filter,
            doc(json!({"subjectID": "s1", "riskLevel": "LOW"})),
            true,
        )
        .await
        .unwrap();
    assert_eq!((replaced.matched, replaced.modified), (1, 1));

    let found = store
        .find(Collection::Analyses, &filter, &FindSpec::default())
        .await
        .unwrap();
    assert_eq!(
        Value::Object(found[0].clone()),
        json!({"_id": id, "subjectID": "s1", "riskLevel": "LOW"})
    );

    store.delete_many(Collection::Analyses, &Document::new()).await.unwrap();
    store.close().await;
}

#[tokio::test]
#[ignore = "requires ALDOUS_TEST_MONGODB_URI"]
async fn insert_many_sort_limit_and_counts() {
    let store = connect().await;
    let ids = store
        .insert_many(
            Collection::Agents,
            vec![doc(json!({"rank": 2})), doc(json!({"rank": 1})), doc(json!({"rank": 3}))],
        )
        .await
        .unwrap();
    assert_eq!(ids.len(), 3);

    let spec = FindSpec::default().sorted("rank", SortOrder::Descending).limit(2);
    let found = store.find(Collection::Agents, &Document::new(), &spec).await.unwrap();
    let ranks: Vec<_> = found.iter().map(|d| d["rank"].clone()).collect();
    assert_eq!(ranks, vec![json!(3), json!(2)]);

    assert_eq!(
        store.count_documents(Collection::Agents, &Document::new()).await.unwrap(),
        3
    );
    assert_eq!(
        store.delete_many(Collection::Agents, &Document::new()).await.unwrap(),
        3
    );
    store.close().await;
}

#[tokio::test]
#[ignore = "requires ALDOUS_TEST_MONGODB_URI"]
async fn upsert_reports_new_id() {
    let store = connect().await;
    let outcome = store
        .update_many(
            Collection::Analyses,
            &doc(json!({"subjectID": "s1"})),
            &doc(json!({"$set": {"riskLevel": "LOW"}})),
            true,
        )
        .await
        .unwrap();
    assert_eq!(outcome.matched, 0);
    assert!(outcome.upserted_id.is_some());

    store.delete_many(Collection::Analyses, &Document::new()).await.unwrap();
    store.close().await;
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let options = MongoOptions {
        uri: "mongodb://127.0.0.1:1/?directConnection=true".to_string(),
        database: "aldous_db".to_string(),
        app_name: None,
        connect_timeout: Duration::from_millis(200),
    };
    let result = MongoStore::connect(&options).await;
    assert!(matches!(result, Err(StoreError::Connection(_))));
}

#[tokio::test]
async fn malformed_uri_is_a_connection_error() {
    let options = MongoOptions {
        uri: "not-a-uri".to_string(),
        database: "aldous_db".to_string(),
        app_name: None,
        connect_timeout: Duration::from_millis(200),
    };
    let result = MongoStore::connect(&options).await;
    assert!(matches!(result, Err(StoreError::Connection(_))));
}
