//! Field-level updates against a JSON document.
//!
//! Paths are dot-separated: object keys by name, array elements by index
//! (`modes.0.beams.1.beam_name`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single path-addressed change to a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldUpdate {
    /// Set the field at `path` to `value` (which may be `null`).
    Set { path: String, value: Value },
    /// Append `value` to the array at `path`.
    Push { path: String, value: Value },
    /// Truncate the array at `path` to `len` elements.
    Truncate { path: String, len: usize },
}

/// Errors that can occur when applying updates to a document.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ApplyError {
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("expected {expected} at '{path}'")]
    TypeMismatch { path: String, expected: &'static str },
}

/// Applies `updates` to `document` in order.
///
/// Stops at the first update that does not resolve; updates before it have
/// already been applied, so callers apply to a copy when they need
/// all-or-nothing.
pub fn apply(document: &mut Value, updates: &[FieldUpdate]) -> Result<(), ApplyError> {
    for update in updates {
        match update {
            FieldUpdate::Set { path, value } => set(document, path, value.clone())?,
            FieldUpdate::Push { path, value } => {
                array_at(document, path)?.push(value.clone());
            }
            FieldUpdate::Truncate { path, len } => {
                array_at(document, path)?.truncate(*len);
            }
        }
    }
    Ok(())
}

fn resolve<'a>(
    document: &'a mut Value,
    path: &str,
    segments: &[&str],
) -> Result<&'a mut Value, ApplyError> {
    let mut current = document;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get_mut(*segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index)),
            _ => None,
        }
        .ok_or_else(|| ApplyError::PathNotFound(path.to_string()))?;
    }
    Ok(current)
}

fn array_at<'a>(document: &'a mut Value, path: &str) -> Result<&'a mut Vec<Value>, ApplyError> {
    let segments: Vec<&str> = path.split('.').collect();
    match resolve(document, path, &segments)? {
        Value::Array(items) => Ok(items),
        _ => Err(ApplyError::TypeMismatch {
            path: path.to_string(),
            expected: "array",
        }),
    }
}

fn set(document: &mut Value, path: &str, value: Value) -> Result<(), ApplyError> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ApplyError::PathNotFound(path.to_string()))?;

    match resolve(document, path, parents)? {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| ApplyError::PathNotFound(path.to_string()))?;
            *slot = value;
            Ok(())
        }
        _ => Err(ApplyError::TypeMismatch {
            path: path.to_string(),
            expected: "object",
        }),
    }
}
