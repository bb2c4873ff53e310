//! Storage error types.

/// Errors that can occur during storage operations.
///
/// Missing records are not errors: lookups return `Option` so callers can
/// decide whether absence is a 404 or a provisioning opportunity.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Attempted to create a record whose id already exists.
    #[error("Record already exists: {kind}/{id}")]
    AlreadyExists {
        /// The kind of record.
        kind: &'static str,
        /// The id of the record.
        id: String,
    },

    /// An internal storage error occurred.
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error indicates a duplicate record.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
