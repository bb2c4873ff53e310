//! # aeos-auth
//!
//! Authentication core for the AEOS API.
//!
//! This crate provides:
//! - JWKS fetching and caching for the external identity provider
//! - Local bearer-token verification (signature, issuer, audience, expiry)
//! - A management-API client for provider-side user provisioning and
//!   token exchange (password, authorization-code, refresh-token grants)
//! - An axum extractor that turns a valid bearer token into an [`Identity`]
//!
//! ## Overview
//!
//! All identity in AEOS is delegated: the provider issues RS256-signed
//! access tokens, and this crate verifies them against the provider's
//! published key set. Downstream code trusts [`Identity`] unconditionally,
//! so every verification path here either produces a valid identity or a
//! classified [`AuthError`], never a default-allow.
//!
//! ## Modules
//!
//! - [`jwks`] - Provider key-set cache with single-flight refresh
//! - [`verifier`] - Bearer-token validation and claim projection
//! - [`identity`] - The verified identity type
//! - [`management`] - Provider management-API client and token exchange
//! - [`middleware`] - Axum bearer-token extractor

pub mod error;
pub mod identity;
pub mod jwks;
pub mod management;
pub mod middleware;
pub mod verifier;

pub use error::AuthError;
pub use identity::Identity;
pub use jwks::{JwksCache, JwksCacheConfig, JwksError};
pub use management::{
    GrantRequest, ManagementClient, ManagementClientConfig, ManagementError, NewProviderUser,
    ProviderUser, TokenSet,
};
pub use middleware::{AuthState, BearerIdentity};
pub use verifier::{TokenVerifier, VerifierConfig};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
