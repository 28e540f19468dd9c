//! Document store adapter.
//!
//! Records are stored as JSON documents grouped into named collections.
//! Every document carries a version counter that starts at 1 and is
//! incremented on each write.
//!
//! All implementations must satisfy these invariants:
//! - A single `replace` or `update_fields` call is atomic: either the whole
//!   new body is committed or nothing is.
//! - Writes without an expected version are last-writer-wins.
//! - Writes with an expected version fail with [`StoreError::VersionConflict`]
//!   when the stored version differs, and change nothing.
//! - Errors are propagated, never silently ignored.

mod memory;

pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use treeform_core::{ApplyError, FieldUpdate};
use uuid::Uuid;

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub version: i64,
    pub body: Value,
    pub created_at: DateTime<Utc>,
}

/// Errors raised by document store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to apply update: {0}")]
    Apply(#[from] ApplyError),

    #[error("document {id} already exists in {collection}")]
    Duplicate { collection: String, id: Uuid },

    #[error("document {id} is at version {actual}, expected {expected}")]
    VersionConflict { id: Uuid, expected: i64, actual: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns `Ok(None)` if no document with `id` exists.
    async fn get_by_id(&self, collection: &str, id: Uuid) -> StoreResult<Option<StoredDocument>>;

    /// All documents in a collection, oldest first.
    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>>;

    /// Inserts a new document at version 1.
    async fn insert(&self, collection: &str, id: Uuid, body: &Value) -> StoreResult<()>;

    /// Replaces the whole body. Returns the matched count (0 if not found).
    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: &Value,
        expected_version: Option<i64>,
    ) -> StoreResult<u64>;

    /// Applies `updates` in order to the stored body. Returns the matched
    /// count (0 if not found).
    async fn update_fields(
        &self,
        collection: &str,
        id: Uuid,
        updates: &[FieldUpdate],
        expected_version: Option<i64>,
    ) -> StoreResult<u64>;

    /// Returns the deleted count.
    async fn delete_by_id(&self, collection: &str, id: Uuid) -> StoreResult<u64>;

    /// Counts documents, optionally only those created at or after `since`.
    async fn count(&self, collection: &str, created_since: Option<DateTime<Utc>>)
        -> StoreResult<u64>;
}

/// Fails with a version conflict when `expected` is set and differs.
pub(crate) fn check_version(id: Uuid, expected: Option<i64>, actual: i64) -> StoreResult<()> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::VersionConflict {
            id,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
