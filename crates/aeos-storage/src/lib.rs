//! Ownership-scoped storage for the AEOS API.
//!
//! # Overview
//!
//! Every record in the system belongs to exactly one user, identified by
//! the provider-issued subject from their token. This crate provides:
//!
//! - [`OwnedRecord`] - the contract records implement (id, owner,
//!   timestamps, soft-delete tombstone, partial updates)
//! - [`OwnedRepository`] - CRUD scoped to an owner; wrong-owner lookups are
//!   indistinguishable from missing records
//! - [`MemoryRepository`] - the in-memory backend
//! - The record types themselves: [`Item`] and [`UserRecord`]
//!
//! # Example
//!
//! ```ignore
//! use aeos_storage::{Item, ListParams, MemoryRepository, OwnedRepository};
//!
//! let repo = MemoryRepository::new();
//! let item = repo.create(Item::new("auth0|42", "Widget", 9.99)).await?;
//! let mine = repo.list("auth0|42", ListParams::default()).await?;
//! assert_eq!(mine.len(), 1);
//! ```

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryRepository;
pub use records::{Item, ItemPatch, ListParams, OwnedRecord, UserPatch, UserRecord};
pub use traits::OwnedRepository;

/// Convenience alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;
