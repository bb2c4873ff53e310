//! The verified identity type.
//!
//! An [`Identity`] is only ever produced by a successful run of the
//! [`TokenVerifier`](crate::TokenVerifier). It is never persisted here;
//! the storage layer uses [`Identity::subject`] as the owner id for all
//! ownership-scoped records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A verified identity extracted from a provider-issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// The provider-issued subject identifier. Opaque; used as the owner
    /// id for all downstream records.
    pub subject: String,

    /// User's email address, if the token carried one.
    pub email: Option<String>,

    /// User's full name.
    pub name: Option<String>,

    /// URL of the user's profile picture.
    pub picture: Option<String>,

    /// Every claim from the token payload, including the promoted ones.
    pub raw_claims: Map<String, Value>,
}

impl Identity {
    /// Looks up an arbitrary claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.raw_claims.get(name)
    }
}
