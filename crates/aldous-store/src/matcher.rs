//! Filter evaluation and update application over JSON documents.
//!
//! Used by [`MemoryStore`](crate::MemoryStore). Covers the subset of the
//! document-database query language the tooling relies on: field equality
//! (dotted paths, array membership), comparison and set operators,
//! `$exists`, top-level `$and` / `$or` / `$nor`, and the `$set`, `$unset`,
//! `$inc`, `$push` and `$setOnInsert` update operators. Anything else is
//! rejected rather than silently ignored.

use std::cmp::Ordering;

use aldous_core::document::ID_FIELD;
use aldous_core::Document;
use serde_json::{Map, Number, Value};

use crate::error::{Result, StoreError};

/// Look up a dotted path, descending through objects and array indexes.
#[must_use]
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Whether `document` satisfies `filter`. An empty filter matches everything.
///
/// # Errors
///
/// Returns `StoreError::Rejected` for unsupported or malformed operators.
pub fn matches(document: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(StoreError::Rejected(format!(
                    "unsupported query operator '{op}'"
                )))
            }
            path => matches_condition(lookup(document, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(key: &str, condition: &'a Value) -> Result<Vec<&'a Document>> {
    let items = condition
        .as_array()
        .ok_or_else(|| StoreError::Rejected(format!("{key} expects an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| StoreError::Rejected(format!("{key} entries must be objects")))
        })
        .collect()
}

fn is_operator_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

fn matches_condition(value: Option<&Value>, condition: &Value) -> Result<bool> {
    let Some(operators) = condition.as_object().filter(|_| is_operator_object(condition)) else {
        return Ok(equals_or_contains(value, condition));
    };

    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$eq" => equals_or_contains(value, operand),
            "$ne" => !equals_or_contains(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => candidates(op, operand)?
                .iter()
                .any(|c| equals_or_contains(value, c)),
            "$nin" => !candidates(op, operand)?
                .iter()
                .any(|c| equals_or_contains(value, c)),
            "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
            other => {
                return Err(StoreError::Rejected(format!(
                    "unsupported query operator '{other}'"
                )))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn candidates<'a>(op: &str, operand: &'a Value) -> Result<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| StoreError::Rejected(format!("{op} expects an array")))
}

/// Equality where a missing field equals `null` and an array field matches
/// if any element does.
fn equals_or_contains(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn compares(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |v: &Value| {
        rank(Some(v)) == rank(Some(operand)) && accept(compare_values(Some(v), Some(operand)))
    };
    match value {
        None => false,
        Some(Value::Array(items)) if !operand.is_array() => items.iter().any(check),
        Some(v) => check(v),
    }
}

/// Structural equality with numeric comparison by value (`1 == 1.0`).
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

const fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting: missing/null < numbers < strings < objects <
/// arrays < booleans, then by value within a type.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or(f64::NAN)
            .partial_cmp(&y.as_f64().unwrap_or(f64::NAN))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_values(Some(l), Some(r)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(Some(lv), Some(rv))))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Apply an operator update document in place.
///
/// `inserting` enables `$setOnInsert`, which is otherwise ignored.
///
/// # Errors
///
/// Returns `StoreError::Rejected` for unsupported operators or operands of the
/// wrong type.
pub fn apply_update(document: &mut Document, update: &Document, inserting: bool) -> Result<()> {
    for (op, fields) in update {
        let fields = fields
            .as_object()
            .ok_or_else(|| StoreError::Rejected(format!("{op} expects an object")))?;
        for (path, operand) in fields {
            match op.as_str() {
                "$set" => set_path(document, path, operand.clone())?,
                "$setOnInsert" => {
                    if inserting {
                        set_path(document, path, operand.clone())?;
                    }
                }
                "$unset" => remove_path(document, path),
                "$inc" => {
                    let next = match lookup(document, path) {
                        None => operand.clone(),
                        Some(current) => add_numbers(path, current, operand)?,
                    };
                    set_path(document, path, next)?;
                }
                "$push" => {
                    let next = match lookup(document, path) {
                        None => Value::Array(vec![operand.clone()]),
                        Some(Value::Array(items)) => {
                            let mut items = items.clone();
                            items.push(operand.clone());
                            Value::Array(items)
                        }
                        Some(_) => {
                            return Err(StoreError::Rejected(format!(
                                "cannot $push to non-array field '{path}'"
                            )))
                        }
                    };
                    set_path(document, path, next)?;
                }
                other => {
                    return Err(StoreError::Rejected(format!(
                        "unsupported update operator '{other}'"
                    )))
                }
            }
        }
    }
    Ok(())
}

fn add_numbers(path: &str, current: &Value, operand: &Value) -> Result<Value> {
    let (Value::Number(a), Value::Number(b)) = (current, operand) else {
        return Err(StoreError::Rejected(format!(
            "cannot $inc non-numeric field '{path}'"
        )));
    };
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Ok(Value::Number(sum.into()));
        }
    }
    let sum = a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| {
            StoreError::Rejected(format!("$inc on '{path}' produced a non-finite number"))
        })
}

fn set_path(document: &mut Document, path: &str, value: Value) -> Result<()> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().unwrap_or(path);
    let mut current = document;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            StoreError::Rejected(format!("cannot create field '{path}' inside a non-object"))
        })?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn remove_path(document: &mut Document, path: &str) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else { return };
    let mut current = document;
    for part in parts {
        match current.get_mut(part).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return,
        }
    }
    current.remove(last);
}

/// Build the document that replaces `existing`: its `_id` plus the fields of
/// `replacement`. Nothing else survives.
///
/// # Errors
///
/// Returns `StoreError::Rejected` if `replacement` holds an update operator
/// or a different `_id`.
pub fn replace_document(existing: Option<&Document>, replacement: Document) -> Result<Document> {
    if let Some(op) = replacement.keys().find(|key| key.starts_with('$')) {
        return Err(StoreError::Rejected(format!(
            "replacement document cannot contain operator '{op}'"
        )));
    }
    let id = existing.and_then(|document| document.get(ID_FIELD));
    if let (Some(old), Some(new)) = (id, replacement.get(ID_FIELD)) {
        if old != new {
            return Err(StoreError::Rejected(format!(
                "the immutable field '{ID_FIELD}' cannot change from {old} to {new}"
            )));
        }
    }

    let mut replaced = Document::new();
    if let Some(id) = id {
        replaced.insert(ID_FIELD.to_string(), id.clone());
    }
    replaced.extend(replacement);
    Ok(replaced)
}

/// Fields a new document inherits from an upsert filter: top-level equality
/// conditions and `$eq` operands.
///
/// # Errors
///
/// Returns `StoreError::Rejected` if a field path cannot be created.
pub fn seed_from_filter(filter: &Document) -> Result<Document> {
    let mut seed = Document::new();
    for (key, condition) in filter {
        if key.starts_with('$') {
            continue;
        }
        if is_operator_object(condition) {
            if let Some(value) = condition.get("$eq") {
                set_path(&mut seed, key, value.clone())?;
            }
        } else {
            set_path(&mut seed, key, condition.clone())?;
        }
    }
    Ok(seed)
}
