use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use treeform_core::{apply, FieldUpdate};
use uuid::Uuid;

use super::{check_version, DocumentStore, StoreError, StoreResult, StoredDocument};

/// In-memory document store.
///
/// Thread-safe via an internal RwLock. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(String, Uuid), StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(collection: &str, id: Uuid) -> (String, Uuid) {
    (collection.to_string(), id)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_by_id(&self, collection: &str, id: Uuid) -> StoreResult<Option<StoredDocument>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&key(collection, id)).cloned())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        let documents = self.documents.read().await;
        let mut found: Vec<StoredDocument> = documents
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, doc)| doc.clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn insert(&self, collection: &str, id: Uuid, body: &Value) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let slot = key(collection, id);
        if documents.contains_key(&slot) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        documents.insert(
            slot,
            StoredDocument {
                id,
                version: 1,
                body: body.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: &Value,
        expected_version: Option<i64>,
    ) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        let Some(doc) = documents.get_mut(&key(collection, id)) else {
            return Ok(0);
        };
        check_version(id, expected_version, doc.version)?;
        doc.body = body.clone();
        doc.version += 1;
        Ok(1)
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: Uuid,
        updates: &[FieldUpdate],
        expected_version: Option<i64>,
    ) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        let Some(doc) = documents.get_mut(&key(collection, id)) else {
            return Ok(0);
        };
        check_version(id, expected_version, doc.version)?;

        // Apply to a copy so a failing update leaves the stored body intact
        let mut body = doc.body.clone();
        apply(&mut body, updates)?;
        doc.body = body;
        doc.version += 1;
        Ok(1)
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&key(collection, id)).map_or(0, |_| 1))
    }

    async fn count(
        &self,
        collection: &str,
        created_since: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        let documents = self.documents.read().await;
        let count = documents
            .iter()
            .filter(|((c, _), doc)| {
                c == collection && created_since.map_or(true, |since| doc.created_at >= since)
            })
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        contract::insert_get_roundtrip(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        contract::duplicate_insert(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_replace_bumps_version() {
        contract::replace_bumps_version(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_replace_with_stale_version() {
        contract::replace_with_stale_version(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_update_fields_applies_in_order() {
        contract::update_fields_applies_in_order(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_failed_update_changes_nothing() {
        contract::failed_update_changes_nothing(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        contract::delete_and_count(&MemoryDocumentStore::new()).await;
    }
}
