//! The ownership-scoped repository trait.
//!
//! All backends must implement [`OwnedRepository`]. Every read and write is
//! scoped by the caller's subject: a lookup with the wrong owner behaves
//! exactly like a lookup for a record that does not exist, so the HTTP
//! layer cannot accidentally leak another user's data.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;
use crate::records::{ListParams, OwnedRecord};

/// CRUD over records of one kind, scoped to their owner.
///
/// Soft-deleted records are invisible to every operation here except
/// [`hard_delete`](Self::hard_delete). Implementations must be thread-safe
/// (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use aeos_storage::{Item, OwnedRepository, StorageError};
///
/// async fn rename(
///     repo: &dyn OwnedRepository<Item>,
///     id: uuid::Uuid,
///     owner: &str,
/// ) -> Result<Option<Item>, StorageError> {
///     let patch = aeos_storage::ItemPatch {
///         name: Some("renamed".into()),
///         ..Default::default()
///     };
///     repo.update(id, owner, patch).await
/// }
/// ```
#[async_trait]
pub trait OwnedRepository<T: OwnedRecord>: Send + Sync {
    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record with the same id
    /// exists, including a soft-deleted one.
    async fn create(&self, record: T) -> Result<T, StorageError>;

    /// Fetches a record by id, scoped to its owner.
    ///
    /// Returns `None` when the record does not exist, is soft-deleted, or
    /// belongs to a different owner. The three cases are deliberately
    /// indistinguishable.
    async fn get(&self, id: Uuid, owner_id: &str) -> Result<Option<T>, StorageError>;

    /// Finds the first live record owned by the given subject.
    ///
    /// Used for one-record-per-owner kinds such as user profiles.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<T>, StorageError>;

    /// Lists live records owned by the given subject in a stable order.
    async fn list(&self, owner_id: &str, params: ListParams) -> Result<Vec<T>, StorageError>;

    /// Applies a partial update to a record, scoped to its owner.
    ///
    /// Fields absent from the patch stay untouched; `updated_at` is bumped
    /// only when the record was found. Returns `None` under the same
    /// conditions as [`get`](Self::get).
    async fn update(
        &self,
        id: Uuid,
        owner_id: &str,
        patch: T::Patch,
    ) -> Result<Option<T>, StorageError>;

    /// Soft-deletes a record by setting its tombstone.
    ///
    /// Idempotent: deleting an already-deleted or missing record returns
    /// `false` without error. The original tombstone timestamp is never
    /// overwritten.
    async fn soft_delete(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError>;

    /// Permanently removes a live record. Tombstoned records are out of
    /// reach here like everywhere else.
    ///
    /// Returns `false` if no live record with that id and owner existed.
    async fn hard_delete(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError>;
}
