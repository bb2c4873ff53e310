//! Error types for bearer-token verification.

use crate::jwks::JwksError;

/// Errors produced by the token verifier.
///
/// Every verification path terminates in either a valid
/// [`Identity`](crate::Identity) or one of these variants. The variants are
/// deliberately fine-grained for logging and tests; the HTTP boundary
/// collapses them into a single generic 401 so a caller cannot probe which
/// check failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The Authorization header or token structure is not usable.
    ///
    /// Covers a missing/ill-shaped header, an undecodable JWT, a missing
    /// `kid` header, and a missing `sub` claim.
    #[error("Malformed credentials: {0}")]
    Malformed(String),

    /// The token's `kid` is not present in the provider's current key set.
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    /// The token header names an algorithm outside the configured allow-list.
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature verification failed against the resolved key.
    #[error("Invalid token signature")]
    BadSignature,

    /// The token's `exp` claim is in the past.
    #[error("Token has expired")]
    Expired,

    /// The token's `aud` claim does not match the configured audience.
    #[error("Token audience mismatch")]
    WrongAudience,

    /// The token's `iss` claim does not match the configured issuer.
    #[error("Token issuer mismatch")]
    WrongIssuer,

    /// The key set could not be fetched from the provider.
    ///
    /// An attacker-controlled token cannot distinguish a legitimate fetch
    /// failure from an unknown key, so this still maps to 401 at the HTTP
    /// boundary rather than a 5xx.
    #[error("Key fetch failed: {0}")]
    KeyFetch(#[from] JwksError),
}

impl AuthError {
    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Returns `true` if the token itself was rejected (as opposed to an
    /// upstream key-fetch problem).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::KeyFetch(_))
    }

    /// Returns `true` if the failure came from the provider rather than
    /// the presented token.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::KeyFetch(JwksError::Network(_)))
            || matches!(self, Self::KeyFetch(JwksError::Http(_)))
    }
}
