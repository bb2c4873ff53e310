//! Bearer-token verification.
//!
//! This is the security-critical path: every identity and ownership
//! decision downstream trusts the verifier's output unconditionally, so it
//! rejects on any ambiguity rather than default-allowing.
//!
//! Verification steps:
//!
//! 1. Split the `Authorization` header: exactly two parts, scheme `Bearer`
//!    (case-insensitive)
//! 2. Decode the unverified token header and extract `kid`
//! 3. Resolve `kid` through the [`JwksCache`]
//! 4. Verify the signature with an algorithm from the configured
//!    allow-list only (never `none`, never a caller-supplied algorithm)
//! 5. Verify `exp`, `iss` (`https://{domain}/`) and `aud`
//! 6. Project claims into [`Identity`]; `sub` is mandatory even after the
//!    signature verifies
//!
//! The verifier has no side effects beyond the key-cache fetch and never
//! touches storage.

use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode_header};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::identity::Identity;
use crate::jwks::{JwksCache, JwksError};

/// Configuration for the token verifier.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected `iss` claim, normally `https://{domain}/`.
    pub issuer: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Accepted signing algorithms. Tokens naming anything else are
    /// rejected before any cryptography runs.
    pub algorithms: Vec<Algorithm>,

    /// Clock-skew tolerance in seconds applied to `exp` (default: 0).
    pub leeway: u64,
}

impl VerifierConfig {
    /// Creates a configuration for a provider domain and audience with the
    /// default RS256-only allow-list.
    #[must_use]
    pub fn new(domain: &str, audience: impl Into<String>) -> Self {
        Self {
            issuer: format!("https://{domain}/"),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            leeway: 0,
        }
    }

    /// Overrides the expected issuer verbatim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the accepted signing algorithms.
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Sets the clock-skew tolerance in seconds.
    #[must_use]
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Verifies provider-issued bearer tokens against cached signing keys.
pub struct TokenVerifier {
    jwks: Arc<JwksCache>,
    config: VerifierConfig,
}

impl TokenVerifier {
    /// Creates a new verifier over a shared key cache.
    #[must_use]
    pub fn new(config: VerifierConfig, jwks: Arc<JwksCache>) -> Self {
        Self { jwks, config }
    }

    /// Returns the shared key cache.
    #[must_use]
    pub fn jwks(&self) -> &Arc<JwksCache> {
        &self.jwks
    }

    /// Authenticates a raw `Authorization` header value.
    ///
    /// Requires exactly two whitespace-separated parts with the `Bearer`
    /// scheme (case-insensitive); any other shape is
    /// [`AuthError::Malformed`].
    ///
    /// # Errors
    ///
    /// See [`verify`](Self::verify) for the failure taxonomy.
    pub async fn authenticate(&self, authorization: &str) -> Result<Identity, AuthError> {
        let token = parse_bearer(authorization)?;
        self.verify(token).await
    }

    /// Verifies a raw JWT and projects its claims into an [`Identity`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::Malformed`] - undecodable token, missing `kid`,
    ///   or missing/empty `sub`
    /// - [`AuthError::UnsupportedAlgorithm`] - header algorithm outside
    ///   the allow-list
    /// - [`AuthError::UnknownKey`] - `kid` absent from the key set
    /// - [`AuthError::BadSignature`] / [`AuthError::Expired`] /
    ///   [`AuthError::WrongAudience`] / [`AuthError::WrongIssuer`]
    /// - [`AuthError::KeyFetch`] - the key set could not be fetched
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::malformed(e.to_string()))?;

        // Reject before any key resolution or cryptography when the header
        // names an algorithm we don't accept.
        if !self.config.algorithms.contains(&header.alg) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::malformed("token has no kid header"))?;

        let (decoding_key, key_alg) = match self.jwks.get_key(&kid).await {
            Ok(resolved) => resolved,
            Err(JwksError::KeyNotFound(_)) => return Err(AuthError::UnknownKey(kid)),
            Err(e) => return Err(AuthError::KeyFetch(e)),
        };

        // The key may declare its own algorithm; it must also be on the
        // allow-list, otherwise the header/key pair is inconsistent.
        if let Some(alg) = key_alg
            && !self.config.algorithms.contains(&alg)
        {
            return Err(AuthError::UnsupportedAlgorithm(format!("{alg:?}")));
        }

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.leeway = self.config.leeway;

        let token_data = jsonwebtoken::decode::<AccessTokenClaims>(token, &decoding_key, &validation)
            .map_err(classify_jwt_error)?;
        let claims = token_data.claims;

        // `sub` is mandatory even when the signature verifies.
        let subject = match &claims.sub {
            Some(sub) if !sub.is_empty() => sub.clone(),
            _ => return Err(AuthError::malformed("token has no sub claim")),
        };

        tracing::debug!(subject = %subject, "Token verified");

        Ok(project_identity(subject, claims))
    }
}

/// Splits an `Authorization` header into its bearer token.
fn parse_bearer(authorization: &str) -> Result<&str, AuthError> {
    let mut parts = authorization.split_whitespace();
    let scheme = parts
        .next()
        .ok_or_else(|| AuthError::malformed("empty Authorization header"))?;
    let token = parts
        .next()
        .ok_or_else(|| AuthError::malformed("Authorization header has no token"))?;

    if parts.next().is_some() {
        return Err(AuthError::malformed(
            "Authorization header has trailing content",
        ));
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::malformed("Authorization scheme is not Bearer"));
    }

    Ok(token)
}

/// Maps jsonwebtoken failures onto the verifier's taxonomy.
fn classify_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidAudience => AuthError::WrongAudience,
        ErrorKind::InvalidIssuer => AuthError::WrongIssuer,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthError::UnsupportedAlgorithm(err.to_string())
        }
        ErrorKind::MissingRequiredClaim(claim) if claim.as_str() == "aud" => {
            AuthError::WrongAudience
        }
        ErrorKind::MissingRequiredClaim(claim) if claim.as_str() == "iss" => {
            AuthError::WrongIssuer
        }
        _ => AuthError::malformed(err.to_string()),
    }
}

/// Projects verified claims into an [`Identity`].
fn project_identity(subject: String, claims: AccessTokenClaims) -> Identity {
    let email = claims.email.clone();
    let name = claims.name.clone();
    let picture = claims.picture.clone();

    let raw_claims = match serde_json::to_value(&claims) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    Identity {
        subject,
        email,
        name,
        picture,
        raw_claims,
    }
}

/// Claims carried by a provider-issued access token.
///
/// Promoted fields cover what the API depends on; everything else lands in
/// `extra` and is preserved in [`Identity::raw_claims`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject identifier. Optional at parse time so its absence can be
    /// reported as a malformed token instead of a deserialization error.
    pub sub: Option<String>,

    /// Issuer identifier.
    pub iss: Option<String>,

    /// Audience (string or array).
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Option<Vec<String>>,

    /// Expiration time (Unix timestamp).
    pub exp: Option<i64>,

    /// Issued-at time (Unix timestamp).
    pub iat: Option<i64>,

    /// User's email address.
    pub email: Option<String>,

    /// User's full name.
    pub name: Option<String>,

    /// URL of the user's profile picture.
    pub picture: Option<String>,

    /// Any claims not defined above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Custom deserializer for audience, which can be a string or an array.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => Ok(Some(vec![s])),
        Some(OneOrMany::Many(v)) => Ok(Some(v)),
        None => Ok(None),
    }
}
