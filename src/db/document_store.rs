use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use treeform_core::{apply, FieldUpdate};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, timestamp};
use crate::store::{check_version, DocumentStore, StoreError, StoreResult, StoredDocument};

/// Attempts at a field-level update before giving up on a document that
/// keeps changing underneath.
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// SQLite-backed document store. Bodies are stored as JSON text.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: String,
    version: i64,
    created_at: String,
}

impl DocumentRow {
    fn into_document(self) -> StoreResult<StoredDocument> {
        Ok(StoredDocument {
            id: parse_uuid(&self.id)?,
            version: self.version,
            body: serde_json::from_str(&self.body)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn version_of(&self, collection: &str, id: Uuid) -> StoreResult<Option<i64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(version)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_by_id(&self, collection: &str, id: Uuid) -> StoreResult<Option<StoredDocument>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, body, version, created_at FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, body, version, created_at FROM documents WHERE collection = ? ORDER BY created_at, id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn insert(&self, collection: &str, id: Uuid, body: &Value) -> StoreResult<()> {
        let body = serde_json::to_string(body)?;
        let now = timestamp(Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, version, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(collection)
        .bind(id.to_string())
        .bind(&body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: &Value,
        expected_version: Option<i64>,
    ) -> StoreResult<u64> {
        let body = serde_json::to_string(body)?;
        let now = timestamp(Utc::now());

        let result = match expected_version {
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE documents SET body = ?, version = version + 1, updated_at = ?
                    WHERE collection = ? AND id = ? AND version = ?
                    "#,
                )
                .bind(&body)
                .bind(&now)
                .bind(collection)
                .bind(id.to_string())
                .bind(expected)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE documents SET body = ?, version = version + 1, updated_at = ?
                    WHERE collection = ? AND id = ?
                    "#,
                )
                .bind(&body)
                .bind(&now)
                .bind(collection)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            if let Some(actual) = self.version_of(collection, id).await? {
                check_version(id, expected_version, actual)?;
            }
        }

        Ok(result.rows_affected())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: Uuid,
        updates: &[FieldUpdate],
        expected_version: Option<i64>,
    ) -> StoreResult<u64> {
        let mut last_seen = 0;

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let row: Option<(String, i64)> = sqlx::query_as(
                "SELECT body, version FROM documents WHERE collection = ? AND id = ?",
            )
            .bind(collection)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

            let Some((body, version)) = row else {
                return Ok(0);
            };
            check_version(id, expected_version, version)?;

            let mut document: Value = serde_json::from_str(&body)?;
            apply(&mut document, updates)?;

            // Compare-and-swap on the version we read
            let result = sqlx::query(
                r#"
                UPDATE documents SET body = ?, version = version + 1, updated_at = ?
                WHERE collection = ? AND id = ? AND version = ?
                "#,
            )
            .bind(serde_json::to_string(&document)?)
            .bind(timestamp(Utc::now()))
            .bind(collection)
            .bind(id.to_string())
            .bind(version)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(1);
            }
            last_seen = version;
            tracing::debug!(%id, version, "document changed during field update, retrying");
        }

        let actual = self.version_of(collection, id).await?.unwrap_or(last_seen);
        Err(StoreError::VersionConflict {
            id,
            expected: last_seen,
            actual,
        })
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(
        &self,
        collection: &str,
        created_since: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        let count: i64 = match created_since {
            Some(since) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM documents WHERE collection = ? AND created_at >= ?",
                )
                .bind(collection)
                .bind(timestamp(since))
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
                    .bind(collection)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count.max(0) as u64)
    }
}
