//! In-memory repository backend.
//!
//! Keeps every record, tombstoned ones included, in a `HashMap` behind a
//! `tokio::sync::RwLock`. Soft-deleted records stay in the map so their ids
//! cannot be reused, and no operation reaches them afterwards.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StorageError;
use crate::records::{ListParams, OwnedRecord};
use crate::traits::OwnedRepository;

/// In-memory implementation of [`OwnedRepository`].
pub struct MemoryRepository<T: OwnedRecord> {
    records: RwLock<HashMap<Uuid, T>>,
}

impl<T: OwnedRecord> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OwnedRecord> MemoryRepository<T> {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records, including soft-deleted ones.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the repository holds no records at all.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

/// Whether `record` is visible to `owner_id`.
fn visible<T: OwnedRecord>(record: &T, owner_id: &str) -> bool {
    record.owner_id() == owner_id && !record.is_deleted()
}

#[async_trait]
impl<T: OwnedRecord> OwnedRepository<T> for MemoryRepository<T> {
    async fn create(&self, record: T) -> Result<T, StorageError> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.id()) {
            return Err(StorageError::already_exists(
                T::KIND,
                record.id().to_string(),
            ));
        }

        tracing::debug!(kind = T::KIND, id = %record.id(), "Created record");
        records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid, owner_id: &str) -> Result<Option<T>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .get(&id)
            .filter(|record| visible(*record, owner_id))
            .cloned())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<T>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| visible(*record, owner_id))
            .min_by_key(|record| record.id())
            .cloned())
    }

    async fn list(&self, owner_id: &str, params: ListParams) -> Result<Vec<T>, StorageError> {
        let records = self.records.read().await;

        let mut owned: Vec<T> = records
            .values()
            .filter(|record| visible(*record, owner_id))
            .cloned()
            .collect();
        // Deterministic order for pagination over an unordered map.
        owned.sort_by_key(OwnedRecord::id);

        let page = owned
            .into_iter()
            .skip(params.skip)
            .take(params.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(page)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: &str,
        patch: T::Patch,
    ) -> Result<Option<T>, StorageError> {
        let mut records = self.records.write().await;

        let Some(record) = records.get_mut(&id).filter(|r| visible(*r, owner_id)) else {
            return Ok(None);
        };

        record.apply_patch(patch);
        record.touch();
        tracing::debug!(kind = T::KIND, %id, "Updated record");
        Ok(Some(record.clone()))
    }

    async fn soft_delete(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;

        let Some(record) = records.get_mut(&id).filter(|r| visible(*r, owner_id)) else {
            return Ok(false);
        };

        record.set_deleted_at(Some(OffsetDateTime::now_utc()));
        tracing::debug!(kind = T::KIND, %id, "Soft-deleted record");
        Ok(true)
    }

    async fn hard_delete(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;

        if !records.get(&id).is_some_and(|r| visible(r, owner_id)) {
            return Ok(false);
        }

        records.remove(&id);
        tracing::debug!(kind = T::KIND, %id, "Hard-deleted record");
        Ok(true)
    }
}
