//! Record types and the ownership contract.
//!
//! Every persisted record carries three pieces of bookkeeping the
//! repository relies on: an `owner_id` (the provider-issued subject of the
//! user who created it), `created_at`/`updated_at` timestamps, and a
//! `deleted_at` tombstone for soft deletion. [`OwnedRecord`] exposes that
//! bookkeeping generically so one repository implementation serves every
//! record kind.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Contract every persisted record implements.
pub trait OwnedRecord: Clone + Send + Sync + 'static {
    /// Partial-update type; fields left `None` stay untouched.
    type Patch: Send;

    /// Record kind, used in error messages and logs.
    const KIND: &'static str;

    /// The record's primary key.
    fn id(&self) -> Uuid;

    /// The provider-issued subject that owns this record.
    fn owner_id(&self) -> &str;

    /// Soft-deletion tombstone, if set.
    fn deleted_at(&self) -> Option<OffsetDateTime>;

    /// Sets or clears the soft-deletion tombstone.
    fn set_deleted_at(&mut self, at: Option<OffsetDateTime>);

    /// Bumps `updated_at` to now.
    fn touch(&mut self);

    /// Applies a partial update. Absent fields stay untouched.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Whether the record is soft-deleted.
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// Pagination parameters for list operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListParams {
    /// Number of records to skip.
    pub skip: usize,

    /// Maximum number of records to return; `None` means unlimited.
    pub limit: Option<usize>,
}

impl ListParams {
    /// Creates pagination parameters.
    #[must_use]
    pub fn new(skip: usize, limit: Option<usize>) -> Self {
        Self { skip, limit }
    }
}

/// A user-owned catalogue item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Primary key.
    pub id: Uuid,

    /// Subject of the owning user.
    pub owner_id: String,

    /// Display name.
    pub name: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Price; validated as positive at the API boundary.
    pub price: f64,

    /// Optional tax amount.
    pub tax: Option<f64>,

    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last-modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// Soft-deletion tombstone.
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Item {
    /// Creates a new item owned by the given subject.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            description: None,
            price,
            tax: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the tax amount.
    #[must_use]
    pub fn with_tax(mut self, tax: f64) -> Self {
        self.tax = Some(tax);
        self
    }
}

/// Partial update for an [`Item`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    /// New name, if provided.
    pub name: Option<String>,

    /// New description, if provided.
    pub description: Option<String>,

    /// New price, if provided.
    pub price: Option<f64>,

    /// New tax amount, if provided.
    pub tax: Option<f64>,
}

impl OwnedRecord for Item {
    type Patch = ItemPatch;

    const KIND: &'static str = "item";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn deleted_at(&self) -> Option<OffsetDateTime> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<OffsetDateTime>) {
        self.deleted_at = at;
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    fn apply_patch(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(tax) = patch.tax {
            self.tax = Some(tax);
        }
    }
}

/// A locally provisioned profile for a provider-managed user.
///
/// Credentials live at the provider; this record only mirrors profile
/// fields. `owner_id` is the provider subject, so a user owns exactly
/// their own record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Primary key.
    pub id: Uuid,

    /// Provider-issued subject. Unique per user.
    pub owner_id: String,

    /// Email address, mirrored from the token.
    pub email: Option<String>,

    /// Full name.
    pub name: Option<String>,

    /// Profile picture URL.
    pub picture: Option<String>,

    /// Company or organisation name.
    pub company: Option<String>,

    /// Whether the account is active. Inactive users keep their records.
    pub active: bool,

    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last-modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// Soft-deletion tombstone.
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl UserRecord {
    /// Provisions an active profile for the given provider subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            owner_id: subject.into(),
            email: None,
            name: None,
            picture: None,
            company: None,
            active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the full name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the profile picture URL.
    #[must_use]
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }
}

/// Partial update for a [`UserRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    /// New full name, if provided.
    pub name: Option<String>,

    /// New picture URL, if provided.
    pub picture: Option<String>,

    /// New company name, if provided.
    pub company: Option<String>,

    /// New active flag, if provided.
    pub active: Option<bool>,
}

impl OwnedRecord for UserRecord {
    type Patch = UserPatch;

    const KIND: &'static str = "user";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn deleted_at(&self) -> Option<OffsetDateTime> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<OffsetDateTime>) {
        self.deleted_at = at;
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(picture) = patch.picture {
            self.picture = Some(picture);
        }
        if let Some(company) = patch.company {
            self.company = Some(company);
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }
}
