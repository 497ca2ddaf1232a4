//! Conversion between JSON documents and BSON.
//!
//! JSON is read as extended JSON, so `{"$date": "..."}` and `{"$oid": "..."}`
//! become native BSON values on the way in. Results are written back as
//! relaxed extended JSON with any `ObjectId` identifier flattened to its hex
//! string.

use aldous_core::document::ID_FIELD;
use aldous_core::Document;
use mongodb::bson::{self, oid::ObjectId, Bson};
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Convert a JSON document to a BSON document.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if a value is not valid extended JSON.
pub fn to_bson(document: Document) -> Result<bson::Document> {
    match Bson::try_from(Value::Object(document)) {
        Ok(Bson::Document(converted)) => Ok(converted),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

/// Convert a filter to BSON, turning hex identifiers back into `ObjectId`s.
///
/// Only values under `_id` are touched, including operator operands such as
/// `{"_id": {"$in": [...]}}`.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if a value is not valid extended JSON.
pub fn filter_to_bson(filter: &Document) -> Result<bson::Document> {
    let mut converted = to_bson(filter.clone())?;
    if let Some(id) = converted.get_mut(ID_FIELD) {
        restore_object_ids(id);
    }
    Ok(converted)
}

fn restore_object_ids(value: &mut Bson) {
    match value {
        Bson::String(text) => {
            if let Ok(oid) = ObjectId::parse_str(text.as_str()) {
                *value = Bson::ObjectId(oid);
            }
        }
        Bson::Array(items) => items.iter_mut().for_each(restore_object_ids),
        Bson::Document(operators) => {
            for (_, operand) in operators.iter_mut() {
                restore_object_ids(operand);
            }
        }
        _ => {}
    }
}

/// Convert a stored BSON document to JSON with `_id` rendered as a string.
#[must_use]
pub fn from_bson(mut document: bson::Document) -> Document {
    if let Some(id) = document.remove(ID_FIELD) {
        document.insert(ID_FIELD, id_to_string(id));
    }
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Render a generated identifier as text.
#[must_use]
pub fn id_to_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(text) => text,
        other => other.into_relaxed_extjson().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use serde_json::json;

    fn json_doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn extended_json_date_becomes_native() {
        let converted = to_bson(json_doc(
            json!({"lastUpdated": {"$date": "2025-05-29T10:30:00.000Z"}}),
        ))
        .unwrap();
        assert!(matches!(converted.get("lastUpdated"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn object_id_rendered_as_hex() {
        let oid = ObjectId::new();
        let stored = doc! { "_id": oid, "name": "Jo", "age": 30 };
        let rendered = from_bson(stored);
        assert_eq!(
            Value::Object(rendered),
            json!({"_id": oid.to_hex(), "name": "Jo", "age": 30})
        );
    }

    #[test]
    fn filter_ids_restored() {
        let oid = ObjectId::new();
        let filter = filter_to_bson(&json_doc(json!({"_id": oid.to_hex()}))).unwrap();
        assert_eq!(filter.get("_id"), Some(&Bson::ObjectId(oid)));

        let filter =
            filter_to_bson(&json_doc(json!({"_id": {"$in": [oid.to_hex(), "custom"]}}))).unwrap();
        assert_eq!(
            filter,
            doc! { "_id": { "$in": [oid, "custom"] } }
        );
    }

    #[test]
    fn other_fields_untouched() {
        let hex = ObjectId::new().to_hex();
        let filter = filter_to_bson(&json_doc(json!({"subjectID": hex.clone()}))).unwrap();
        assert_eq!(filter.get("subjectID"), Some(&Bson::String(hex)));
    }

    #[test]
    fn string_ids_pass_through() {
        assert_eq!(id_to_string(Bson::String("abc".into())), "abc");
        assert_eq!(id_to_string(Bson::Int32(7)), "7");
    }
}
