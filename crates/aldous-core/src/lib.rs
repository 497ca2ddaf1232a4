//! Core types for the Aldous document tooling.
//!
//! This crate provides the foundational, I/O-free pieces shared by the store,
//! gateway and analysis crates:
//!
//! - **Collections**: the five recognised collection names
//! - **Documents**: JSON object documents and value helpers
//! - **Schema**: per-collection required fields, allowed values and defaults
//! - **Queries**: filters, update expressions and find options
//!
//! # Example
//!
//! ```
//! use aldous_core::{schema, Collection};
//! use serde_json::json;
//!
//! let collection: Collection = "agents".parse().unwrap();
//! let document = json!({"name": "Guide", "aiModel": "gpt-4o", "phone": "+1"});
//!
//! let validated = schema::validate(collection, document.as_object().unwrap()).unwrap();
//! assert_eq!(validated["activeStatus"], json!(true));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collection;
pub mod document;
pub mod query;
pub mod schema;

pub use collection::{Collection, UnknownCollection};
pub use document::Document;
pub use query::{Filter, FindSpec, SortOrder, SortSpec, UpdateError, UpdateExpr};
pub use schema::{CollectionSchema, FieldDefault, SchemaViolation};
