//! Command execution and output.
//!
//! Results go to stdout; warnings and logs go to stderr.

use std::collections::BTreeMap;
use std::io::Write;

use aldous_analysis::{CompletionModel, DashboardUpdater, RefreshOutcome};
use aldous_core::{Collection, Document, Filter, FindSpec, SortOrder, UpdateExpr};
use aldous_gateway::{input, CollectionStats, DocumentGateway, GatewayError, UpdateSummary};
use aldous_store::DocumentStore;
use anyhow::{Context, Result};

use crate::templates;

/// A parsed database command, ready to run against a gateway.
#[derive(Debug)]
pub enum Request {
    /// Insert one document.
    Upload {
        /// Target collection.
        collection: String,
        /// Document text.
        data: String,
    },
    /// Update matching documents.
    Update {
        /// Target collection.
        collection: String,
        /// Update payload text.
        data: String,
        /// Which documents to update.
        filter: Filter,
        /// Insert when nothing matches.
        upsert: bool,
        /// Treat the payload as operator directives.
        operators: bool,
    },
    /// Delete matching documents.
    Delete {
        /// Target collection.
        collection: String,
        /// Which documents to delete.
        filter: Filter,
    },
    /// Read matching documents.
    Query {
        /// Target collection.
        collection: String,
        /// Which documents to read.
        filter: Filter,
        /// Limit and sort.
        spec: FindSpec,
    },
    /// Insert every valid document from a file.
    Bulk {
        /// Target collection.
        collection: String,
        /// JSON file with one object or an array of objects.
        file: std::path::PathBuf,
    },
    /// Count documents.
    Stats {
        /// One collection, or all when `None`.
        collection: Option<String>,
    },
    /// Regenerate a subject's assessment.
    Analyze {
        /// The subject to assess.
        subject: String,
    },
}

/// Parse a filter argument. Absent means every document for reads.
///
/// # Errors
///
/// Returns `GatewayError::MalformedInput` if the text is not a JSON object.
pub fn parse_filter(text: Option<&str>, all: bool) -> Result<Filter, GatewayError> {
    match text {
        Some(text) if !all => Ok(Filter::Matching(input::parse_document(text)?)),
        _ => Ok(Filter::All),
    }
}

/// Build find options from the query flags.
pub fn find_spec(limit: u64, sort: Option<String>, ascending: bool) -> FindSpec {
    let spec = FindSpec::default().limit(limit);
    match sort {
        Some(field) => {
            let order = if ascending {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };
            spec.sorted(field, order)
        }
        None => spec,
    }
}

/// Run `request` and write its human-readable result to `out`.
///
/// # Errors
///
/// Returns the gateway or analysis error that stopped the command.
pub async fn execute<S, M, W>(
    gateway: &DocumentGateway<S>,
    request: Request,
    model: Option<M>,
    out: &mut W,
) -> Result<()>
where
    S: DocumentStore,
    M: CompletionModel,
    W: Write,
{
    match request {
        Request::Upload { collection, data } => {
            let document = input::parse_document(&data)?;
            let id = gateway.upload(&collection, document).await?;
            writeln!(out, "Uploaded document to '{collection}' with ID: {id}")?;
        }
        Request::Update {
            collection,
            data,
            filter,
            upsert,
            operators,
        } => {
            let payload = input::parse_document(&data)?;
            let update = if operators {
                UpdateExpr::RawOperators(payload)
            } else {
                UpdateExpr::SetFields(payload)
            };
            let summary = gateway.update(&collection, &filter, update, upsert).await?;
            write_update(out, &collection, &summary)?;
        }
        Request::Delete { collection, filter } => {
            if matches!(filter, Filter::All) {
                eprintln!("Warning: deleting every document in '{collection}'");
            }
            let deleted = gateway.delete(&collection, &filter).await?;
            writeln!(out, "Deleted {deleted} document(s) from '{collection}'")?;
        }
        Request::Query {
            collection,
            filter,
            spec,
        } => {
            let documents = gateway.query(&collection, &filter, &spec).await?;
            write_documents(out, &collection, &documents)?;
        }
        Request::Bulk { collection, file } => {
            let documents = input::read_documents_file(&file).await?;
            let total = documents.len();
            let ids = gateway.bulk_upload(&collection, documents).await?;
            if ids.is_empty() {
                writeln!(out, "No valid documents to upload")?;
            } else {
                writeln!(
                    out,
                    "Bulk uploaded {} of {total} document(s) to '{collection}'",
                    ids.len()
                )?;
                for id in ids {
                    writeln!(out, "  {id}")?;
                }
            }
        }
        Request::Stats { collection } => {
            let stats = gateway.stats(collection.as_deref()).await?;
            write_stats(out, &stats)?;
        }
        Request::Analyze { subject } => {
            let model = model.context("analysis requires a completion model")?;
            let outcome = DashboardUpdater::new(gateway, model).refresh(&subject).await?;
            write_refresh(out, &outcome)?;
        }
    }
    Ok(())
}

/// Print the starter document for a collection.
///
/// # Errors
///
/// Returns `GatewayError::UnknownCollection` for an unrecognised name.
pub fn print_template<W: Write>(out: &mut W, collection: &str, bulk: bool) -> Result<()> {
    let collection: Collection = collection.parse().map_err(GatewayError::from)?;
    let value = if bulk {
        templates::bulk_template(collection)
    } else {
        templates::template(collection)
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn write_update<W: Write>(out: &mut W, collection: &str, summary: &UpdateSummary) -> Result<()> {
    writeln!(
        out,
        "Updated {} document(s) in '{collection}' ({} matched)",
        summary.modified, summary.matched
    )?;
    if let Some(id) = &summary.upserted_id {
        writeln!(out, "Created new document with ID: {id}")?;
    }
    Ok(())
}

fn write_documents<W: Write>(out: &mut W, collection: &str, documents: &[Document]) -> Result<()> {
    writeln!(out, "Found {} document(s) in '{collection}'", documents.len())?;
    for (index, document) in documents.iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, serde_json::to_string_pretty(document)?)?;
    }
    Ok(())
}

fn write_stats<W: Write>(out: &mut W, stats: &BTreeMap<Collection, CollectionStats>) -> Result<()> {
    for (collection, counts) in stats {
        writeln!(
            out,
            "{collection}: {} documents (estimated {})",
            counts.exact_count, counts.estimated_count
        )?;
    }
    Ok(())
}

fn write_refresh<W: Write>(out: &mut W, outcome: &RefreshOutcome) -> Result<()> {
    let action = if outcome.created_id.is_some() {
        "Created"
    } else {
        "Updated"
    };
    writeln!(
        out,
        "{action} analysis for subject {}: {} conversation(s), {} message(s), risk level {}",
        outcome.subject_id,
        outcome.conversation_count,
        outcome.message_count,
        outcome.risk_level.as_deref().unwrap_or("unknown")
    )?;
    Ok(())
}
