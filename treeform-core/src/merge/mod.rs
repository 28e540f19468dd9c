//! Identity-preserving tree merge.
//!
//! A stored record is reconciled against a caller-supplied desired state.
//! Nested nodes are matched by position only: the node at index `i` of a
//! stored collection is merged in place with index `i` of the incoming
//! collection, extra incoming nodes are appended with fresh identifiers, and
//! trailing stored nodes are dropped.
//!
//! Every change made during a merge is also recorded as a [`FieldUpdate`],
//! so callers can persist either the merged document or just the updates.

mod macros;
mod ops;

pub(crate) use macros::mergeable;
pub use ops::{apply, ApplyError, FieldUpdate};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A record or node type that can be merged in place.
///
/// Implementations are generated by the `mergeable!` macro from a
/// declaration of the type's scalar fields and child collections.
pub trait Mergeable: Clone + Serialize {
    /// Merges `incoming` into `self`.
    ///
    /// `self.id` is never touched. `parent_link` names the parent-reference
    /// field of the collection this node lives in; that field is skipped too.
    fn merge_from(&mut self, incoming: &Self, ctx: &mut MergeContext, parent_link: Option<&str>);

    /// Assigns identifiers to this node and its whole subtree according to
    /// `policy`, pointing every child's parent reference at its owner.
    fn assign_identity(&mut self, policy: IdPolicy);
}

/// How identifiers are chosen for newly created nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Every identifier is replaced with a fresh UUID.
    #[default]
    ServerGenerated,
    /// Caller identifiers are kept; nil identifiers get a fresh UUID.
    ClientSupplied,
}

impl IdPolicy {
    /// Returns the identifier a node carrying `current` should end up with.
    pub fn resolve(self, current: Uuid) -> Uuid {
        match self {
            IdPolicy::ServerGenerated => Uuid::new_v4(),
            IdPolicy::ClientSupplied if current.is_nil() => Uuid::new_v4(),
            IdPolicy::ClientSupplied => current,
        }
    }
}

impl fmt::Display for IdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdPolicy::ServerGenerated => write!(f, "server_generated"),
            IdPolicy::ClientSupplied => write!(f, "client_supplied"),
        }
    }
}

impl FromStr for IdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "server_generated" => Ok(IdPolicy::ServerGenerated),
            "client_supplied" => Ok(IdPolicy::ClientSupplied),
            _ => Err(format!(
                "Invalid id policy '{}'. Valid options: server_generated, client_supplied",
                s
            )),
        }
    }
}

/// Errors raised while recording updates during a merge.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to serialize value at '{path}': {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Tracks the current document path and the updates emitted so far.
///
/// A context built with [`MergeContext::discarding`] tracks nothing.
#[derive(Debug)]
pub struct MergeContext {
    recording: bool,
    path: Vec<String>,
    updates: Vec<FieldUpdate>,
    error: Option<MergeError>,
}

impl Default for MergeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeContext {
    pub fn new() -> Self {
        Self {
            recording: true,
            path: Vec::new(),
            updates: Vec::new(),
            error: None,
        }
    }

    /// A context for merges whose updates are not needed.
    pub fn discarding() -> Self {
        Self {
            recording: false,
            ..Self::new()
        }
    }

    fn path_to(&self, field: &str) -> String {
        let mut segments = self.path.clone();
        segments.push(field.to_string());
        segments.join(".")
    }

    fn to_value<V: Serialize>(&mut self, path: &str, value: &V) -> Option<serde_json::Value> {
        match serde_json::to_value(value) {
            Ok(value) => Some(value),
            Err(source) => {
                if self.error.is_none() {
                    self.error = Some(MergeError::Serialization {
                        path: path.to_string(),
                        source,
                    });
                }
                None
            }
        }
    }

    /// Records that the scalar `field` at the current path now holds `value`.
    pub fn record_set<V: Serialize>(&mut self, field: &str, value: &V) {
        if !self.recording {
            return;
        }
        let path = self.path_to(field);
        if let Some(value) = self.to_value(&path, value) {
            self.updates.push(FieldUpdate::Set { path, value });
        }
    }

    fn record_push<V: Serialize>(&mut self, field: &str, value: &V) {
        if !self.recording {
            return;
        }
        let path = self.path_to(field);
        if let Some(value) = self.to_value(&path, value) {
            self.updates.push(FieldUpdate::Push { path, value });
        }
    }

    fn record_truncate(&mut self, field: &str, len: usize) {
        if !self.recording {
            return;
        }
        let path = self.path_to(field);
        self.updates.push(FieldUpdate::Truncate { path, len });
    }

    fn enter(&mut self, field: &str, index: usize) {
        if !self.recording {
            return;
        }
        self.path.push(field.to_string());
        self.path.push(index.to_string());
    }

    fn leave(&mut self) {
        if !self.recording {
            return;
        }
        self.path.truncate(self.path.len().saturating_sub(2));
    }

    /// Consumes the context, returning the updates in the order they apply.
    pub fn into_updates(self) -> Result<Vec<FieldUpdate>, MergeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.updates),
        }
    }
}

/// Merges the collection `field` of one owner node.
///
/// `link` is the parent-reference field of the element type and `adopt`
/// points an appended element at its new owner.
pub fn merge_collection<T, F>(
    existing: &mut Vec<T>,
    incoming: &[T],
    ctx: &mut MergeContext,
    field: &str,
    link: &str,
    adopt: F,
) where
    T: Mergeable,
    F: Fn(&mut T),
{
    for (index, next) in incoming.iter().enumerate() {
        if let Some(current) = existing.get_mut(index) {
            ctx.enter(field, index);
            current.merge_from(next, ctx, Some(link));
            ctx.leave();
        } else {
            let mut node = next.clone();
            node.assign_identity(IdPolicy::ServerGenerated);
            adopt(&mut node);
            ctx.record_push(field, &node);
            existing.push(node);
        }
    }

    if existing.len() > incoming.len() {
        existing.truncate(incoming.len());
        ctx.record_truncate(field, incoming.len());
    }
}

/// Merges `incoming` into `existing` in place.
pub fn merge<T: Mergeable>(existing: &mut T, incoming: &T) {
    let mut ctx = MergeContext::discarding();
    existing.merge_from(incoming, &mut ctx, None);
}

/// Merges `incoming` into `existing` and returns the field-level updates
/// that turn the previous serialization of `existing` into the new one.
pub fn merge_with_updates<T: Mergeable>(
    existing: &mut T,
    incoming: &T,
) -> Result<Vec<FieldUpdate>, MergeError> {
    let mut ctx = MergeContext::new();
    existing.merge_from(incoming, &mut ctx, None);
    ctx.into_updates()
}
