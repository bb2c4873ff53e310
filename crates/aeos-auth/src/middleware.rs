//! Axum integration for bearer-token authentication.
//!
//! # Overview
//!
//! [`BearerIdentity`] is an extractor: adding it to a handler's arguments
//! requires a valid provider-issued token on the request.
//!
//! ```ignore
//! async fn whoami(BearerIdentity(identity): BearerIdentity) -> Json<Identity> {
//!     Json(identity)
//! }
//! ```
//!
//! Every authentication failure is collapsed to the same 401 response so
//! the boundary does not leak which verification step rejected the token.
//! The precise variant is still logged server-side.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{error::AuthError, identity::Identity, verifier::TokenVerifier};

/// Shared authentication state for the router.
#[derive(Clone)]
pub struct AuthState {
    /// The token verifier.
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    /// Creates authentication state from a verifier.
    #[must_use]
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

/// Extractor that authenticates the request's bearer token.
///
/// Wraps the verified [`Identity`]. Rejection is an [`AuthError`], which
/// renders as a generic 401.
pub struct BearerIdentity(pub Identity);

impl<S> FromRequestParts<S> for BearerIdentity
where
    S: Send + Sync,
    AuthState: axum::extract::FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AuthError::malformed("Missing Authorization header"))?;

        let identity = auth_state.verifier.authenticate(header_value).await?;
        Ok(Self(identity))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_upstream() {
            tracing::warn!(error = %self, "Authentication failed upstream");
        } else {
            tracing::debug!(error = %self, "Rejected bearer token");
        }

        // One uniform body regardless of the variant.
        let body = axum::Json(json!({
            "detail": "Could not validate credentials",
            "status_code": 401,
            "error_type": "unauthorized",
        }));

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            body,
        )
            .into_response()
    }
}
