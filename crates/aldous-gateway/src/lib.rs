//! Schema-validated document gateway for the Aldous database.
//!
//! The gateway is the single entry point for writing to the five
//! collections. It rejects unknown collection names, checks each document
//! against its collection's rules before insertion, and guards writes that
//! would touch every document behind an explicit [`Filter::All`].
//!
//! # Operations
//!
//! - `upload`: validate and insert one document
//! - `update`: apply field assignments or operator directives, with optional upsert
//! - `replace`: swap the first match for a validated document, with optional upsert
//! - `query`: filtered read with optional sort and limit
//! - `delete`: remove every match
//! - `stats`: exact and estimated counts per collection
//! - `bulk_upload`: validate a batch, skip invalid documents, insert the rest
//!
//! # Example
//!
//! ```
//! # async fn example() -> aldous_gateway::Result<()> {
//! use std::sync::Arc;
//!
//! use aldous_core::{Filter, FindSpec};
//! use aldous_gateway::{input, DocumentGateway};
//! use aldous_store::MemoryStore;
//!
//! let gateway = DocumentGateway::new(Arc::new(MemoryStore::new()));
//! let user = input::parse_document(r#"{"username": "john", "userClass": "client"}"#)?;
//! let id = gateway.upload("users", user).await?;
//!
//! let found = gateway
//!     .query("users", &Filter::field("_id", id), &FindSpec::default())
//!     .await?;
//! assert_eq!(found.len(), 1);
//! gateway.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! [`Filter::All`]: aldous_core::Filter::All

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod input;

pub use config::GatewayConfig;
pub use error::{GatewayError, Operation, Result};
pub use gateway::{CollectionStats, DocumentGateway, UpdateSummary};
