//! Request and response bodies.
//!
//! Request types validate themselves before any handler logic runs;
//! validation failures collect into a per-field map rendered as a 422.
//! Update bodies translate into storage patches where absent fields mean
//! "leave untouched".

use aeos_storage::{Item, ItemPatch, ListParams, UserPatch, UserRecord};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};

const MIN_PASSWORD_LEN: usize = 8;

fn looks_like_email(value: &str) -> bool {
    // Deliverability is the provider's problem; this only catches typos.
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email used as the provider username.
    pub email: String,

    /// Password.
    pub password: String,
}

impl LoginRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if !looks_like_email(&self.email) {
            errors.push("email", "must be a valid email address");
        }
        if self.password.is_empty() {
            errors.push("password", "must not be empty");
        }
        errors.finish()
    }
}

/// Body for `POST /auth/signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Email for the new account.
    pub email: String,

    /// Initial password.
    pub password: String,

    /// Optional full name.
    pub name: Option<String>,
}

impl SignupRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if !looks_like_email(&self.email) {
            errors.push("email", "must be a valid email address");
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            errors.push(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        errors.finish()
    }
}

/// Response for `POST /auth/signup`: the provisioned provider account,
/// stripped to safe fields.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    /// Provider-issued subject of the new user.
    pub user_id: String,

    /// Email address.
    pub email: Option<String>,

    /// Full name.
    pub name: Option<String>,

    /// Whether the email is verified.
    pub email_verified: bool,
}

impl From<aeos_auth::ProviderUser> for SignupResponse {
    fn from(user: aeos_auth::ProviderUser) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
        }
    }
}

/// Body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token issued at login.
    pub refresh_token: String,
}

impl RefreshRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.refresh_token.is_empty() {
            errors.push("refresh_token", "must not be empty");
        }
        errors.finish()
    }
}

/// Body for `POST /auth/social-callback`.
#[derive(Debug, Deserialize)]
pub struct SocialCallbackRequest {
    /// Authorization code from the provider redirect.
    pub code: String,

    /// The redirect URI the code was issued for.
    pub redirect_uri: String,
}

impl SocialCallbackRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.code.is_empty() {
            errors.push("code", "must not be empty");
        }
        if self.redirect_uri.is_empty() {
            errors.push("redirect_uri", "must not be empty");
        }
        errors.finish()
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Body for `POST /items`.
#[derive(Debug, Deserialize)]
pub struct ItemCreate {
    /// Display name.
    pub name: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Price; must be positive.
    pub price: f64,

    /// Optional tax amount; must not be negative.
    pub tax: Option<f64>,
}

impl ItemCreate {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "must not be empty");
        }
        if !(self.price > 0.0) {
            errors.push("price", "must be greater than zero");
        }
        if let Some(tax) = self.tax
            && tax < 0.0
        {
            errors.push("tax", "must not be negative");
        }
        errors.finish()
    }

    /// Builds the record, owned by the given subject.
    #[must_use]
    pub fn into_item(self, owner_id: &str) -> Item {
        let mut item = Item::new(owner_id, self.name, self.price);
        item.description = self.description;
        item.tax = self.tax;
        item
    }
}

/// Body for `PUT /items/{id}`. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ItemUpdate {
    /// New name, if provided.
    pub name: Option<String>,

    /// New description, if provided.
    pub description: Option<String>,

    /// New price, if provided.
    pub price: Option<f64>,

    /// New tax amount, if provided.
    pub tax: Option<f64>,
}

impl ItemUpdate {
    /// Validates the provided fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.push("name", "must not be empty");
        }
        if let Some(price) = self.price
            && !(price > 0.0)
        {
            errors.push("price", "must be greater than zero");
        }
        if let Some(tax) = self.tax
            && tax < 0.0
        {
            errors.push("tax", "must not be negative");
        }
        errors.finish()
    }

    /// Converts into a storage patch.
    #[must_use]
    pub fn into_patch(self) -> ItemPatch {
        ItemPatch {
            name: self.name,
            description: self.description,
            price: self.price,
            tax: self.tax,
        }
    }
}

/// An item as returned to clients.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    /// Primary key.
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Price.
    pub price: f64,

    /// Optional tax amount.
    pub tax: Option<f64>,

    /// Subject of the owning user.
    pub owner_id: String,

    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last-modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            tax: item.tax,
            owner_id: item.owner_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Largest page size a single list request may return.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Pagination query parameters for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Records to skip (default: 0).
    #[serde(default)]
    pub skip: usize,

    /// Maximum records to return (default and cap: [`MAX_PAGE_LIMIT`]).
    pub limit: Option<usize>,
}

impl PageQuery {
    /// Converts to storage pagination, clamping `limit` to
    /// `1..=`[`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn into_params(self) -> ListParams {
        let limit = self.limit.unwrap_or(MAX_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        ListParams::new(self.skip, Some(limit))
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Body for `PUT /users/me`. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    /// New full name, if provided.
    pub name: Option<String>,

    /// New picture URL, if provided.
    pub picture: Option<String>,

    /// New company name, if provided.
    pub company: Option<String>,

    /// New active flag, if provided.
    pub active: Option<bool>,
}

impl UserUpdate {
    /// Validates the provided fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with per-field messages.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.push("name", "must not be empty");
        }
        errors.finish()
    }

    /// Converts into a storage patch.
    #[must_use]
    pub fn into_patch(self) -> UserPatch {
        UserPatch {
            name: self.name,
            picture: self.picture,
            company: self.company,
            active: self.active,
        }
    }
}

/// A user profile as returned to clients.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Primary key.
    pub id: Uuid,

    /// Provider-issued subject.
    pub subject: String,

    /// Email address.
    pub email: Option<String>,

    /// Full name.
    pub name: Option<String>,

    /// Profile picture URL.
    pub picture: Option<String>,

    /// Company or organisation name.
    pub company: Option<String>,

    /// Whether the account is active.
    pub active: bool,

    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last-modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            subject: user.owner_id,
            email: user.email,
            name: user.name,
            picture: user.picture,
            company: user.company,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
