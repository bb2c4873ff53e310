//! The API error taxonomy and its JSON envelope.
//!
//! Every non-success response uses one envelope shape:
//!
//! ```json
//! {
//!   "detail": "Item not found",
//!   "status_code": 404,
//!   "error_type": "not_found"
//! }
//! ```
//!
//! Validation failures add an `errors` map of field name to message list.
//! Authentication failures never reach this type; they render through
//! [`AuthError`](aeos_auth::AuthError)'s own uniform 401.

use std::collections::BTreeMap;

use aeos_auth::ManagementError;
use aeos_storage::StorageError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested record does not exist or is not visible to the caller.
    #[error("{detail}")]
    NotFound {
        /// Human-readable message.
        detail: String,
    },

    /// The request conflicts with existing state.
    #[error("{detail}")]
    Conflict {
        /// Human-readable message.
        detail: String,
    },

    /// The request body failed validation.
    #[error("Validation failed")]
    Validation {
        /// Field name to messages, in the order they were recorded.
        errors: BTreeMap<String, Vec<String>>,
    },

    /// The identity provider rejected the caller's credentials.
    #[error("{detail}")]
    Unauthorized {
        /// Human-readable message.
        detail: String,
    },

    /// The identity provider failed or misbehaved.
    #[error("Identity provider unavailable")]
    Upstream,

    /// An internal error occurred.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Creates a `Conflict` error.
    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    /// Creates an `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Unauthorized {
            detail: detail.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Validation { .. } => "validation_error",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Upstream => "bad_gateway",
            Self::Internal => "internal_error",
        }
    }
}

/// Accumulates per-field validation failures.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for a field. A field can fail more than once.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns `Ok(())` when no failures were recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] carrying the collected failures.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation {
                errors: self.errors,
            })
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { kind, .. } => {
                Self::conflict(format!("{kind} already exists"))
            }
            StorageError::Internal { message } => {
                tracing::error!(error = %message, "Storage failure");
                Self::Internal
            }
        }
    }
}

impl From<ManagementError> for ApiError {
    fn from(err: ManagementError) -> Self {
        match err {
            ManagementError::Conflict => Self::conflict("User already exists"),
            // Surface the provider's description, not the OAuth code.
            ManagementError::OAuth { description, .. } if !description.is_empty() => {
                Self::unauthorized(description)
            }
            ManagementError::OAuth { .. } => Self::unauthorized("Invalid credentials"),
            ManagementError::Provider { status, message } => {
                tracing::error!(status, %message, "Provider failure");
                Self::Upstream
            }
            ManagementError::Network(e) => {
                tracing::error!(error = %e, "Provider unreachable");
                Self::Upstream
            }
            ManagementError::Parse(message) => {
                tracing::error!(%message, "Unparseable provider response");
                Self::Upstream
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    detail: String,
    status_code: u16,
    error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let errors = match &self {
            Self::Validation { errors } => Some(errors),
            _ => None,
        };

        let body = Json(ErrorEnvelope {
            detail: self.to_string(),
            status_code: status.as_u16(),
            error_type: self.error_type(),
            errors,
        });

        (status, body).into_response()
    }
}
