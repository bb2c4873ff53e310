//! Provider JWKS fetching and caching.
//!
//! The identity provider publishes its signing keys at
//! `https://{domain}/.well-known/jwks.json`. This module caches that key
//! set as a whole (the endpoint returns the complete set atomically and
//! rotation is infrequent), replaces it wholesale on refresh, and looks
//! keys up by `kid`.
//!
//! # Single-flight refresh
//!
//! Many requests can arrive simultaneously carrying a `kid` the cache has
//! never seen, for example right after a key rotation. Refreshes are
//! guarded by a dedicated mutex: each caller that misses re-checks the
//! cache after acquiring the guard, so N concurrent misses trigger exactly
//! one upstream fetch and all N await its result.
//!
//! # Security Considerations
//!
//! - Only HTTPS URIs are allowed for the JWKS endpoint (configurable for
//!   testing)
//! - HTTP timeouts prevent hanging on slow endpoints
//! - Response size is limited to prevent oversized-payload abuse

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Configuration for the JWKS cache.
#[derive(Debug, Clone)]
pub struct JwksCacheConfig {
    /// How long a fetched key set stays fresh (default: 1 hour).
    pub ttl: Duration,

    /// HTTP request timeout (default: 10 seconds).
    pub request_timeout: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,

    /// Whether to allow HTTP (non-HTTPS) JWKS URIs.
    /// This should only be enabled for testing.
    pub allow_http: bool,
}

impl Default for JwksCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024,
            allow_http: false,
        }
    }
}

impl JwksCacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key-set TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Allows HTTP (non-HTTPS) JWKS URIs.
    ///
    /// # Warning
    ///
    /// This should only be used for testing. In production, the JWKS
    /// endpoint must use HTTPS.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }
}

/// Errors that can occur during JWKS operations.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the key set.
    #[error("Network error: {0}")]
    Network(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// The response could not be parsed as a JWK set.
    #[error("Failed to parse JWKS: {0}")]
    Parse(String),

    /// The requested key id was not found in the key set.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The key could not be converted to a decoding key.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The JWKS URI scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme: only HTTPS is allowed")]
    InvalidScheme,

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

/// Cached key set with fetch metadata.
struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

/// In-memory cache for the provider's key set.
///
/// Holds at most one key set (the provider publishes a single JWKS URL);
/// the set is replaced wholesale on every refresh. Stale keys are simply
/// superseded, never deleted individually.
pub struct JwksCache {
    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,
    /// The provider's JWKS endpoint.
    jwks_uri: Url,
    /// The cached key set, if any.
    cached: Arc<RwLock<Option<CachedJwks>>>,
    /// Serializes refreshes so concurrent misses share one fetch.
    refresh_guard: Mutex<()>,
    /// Configuration.
    config: JwksCacheConfig,
}

impl JwksCache {
    /// Creates a new JWKS cache for the given endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(jwks_uri: Url, config: JwksCacheConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            jwks_uri,
            cached: Arc::new(RwLock::new(None)),
            refresh_guard: Mutex::new(()),
            config,
        }
    }

    /// Builds a cache pointing at `https://{domain}/.well-known/jwks.json`.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the domain does not form a valid URL.
    pub fn for_domain(domain: &str, config: JwksCacheConfig) -> Result<Self, url::ParseError> {
        let uri = Url::parse(&format!("https://{domain}/.well-known/jwks.json"))?;
        Ok(Self::new(uri, config))
    }

    /// Gets a decoding key by key id.
    ///
    /// Checks the cache first. On a miss (no entry, expired entry, or an
    /// entry without the requested `kid`) a refresh is performed, shared
    /// between concurrent callers, and the lookup is retried once against
    /// the fresh set.
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::KeyNotFound`] if the key is absent even after
    /// a refresh, or a fetch error if the key set could not be retrieved.
    pub async fn get_key(&self, kid: &str) -> Result<(DecodingKey, Option<Algorithm>), JwksError> {
        let started = Instant::now();

        if let Some(found) = self.lookup(kid).await? {
            tracing::trace!(kid, "JWKS cache hit");
            return Ok(found);
        }

        tracing::debug!(kid, "JWKS cache miss, refreshing key set");
        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited for the guard.
        // If the entry is newer than our miss, use it without fetching.
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref()
                && entry.fetched_at >= started
                && Instant::now() < entry.expires_at
            {
                return match find_key(&entry.jwks, kid) {
                    Some(found) => found,
                    None => Err(JwksError::KeyNotFound(kid.to_string())),
                };
            }
        }

        self.fetch_and_store().await?;

        self.lookup(kid)
            .await?
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    /// Looks a key up in the cache without fetching.
    ///
    /// Returns `Ok(None)` when the cache is empty, expired, or has no key
    /// with the given id.
    async fn lookup(&self, kid: &str) -> Result<Option<(DecodingKey, Option<Algorithm>)>, JwksError> {
        let cached = self.cached.read().await;
        let Some(entry) = cached.as_ref() else {
            return Ok(None);
        };
        if Instant::now() >= entry.expires_at {
            return Ok(None);
        }
        match find_key(&entry.jwks, kid) {
            Some(found) => found.map(Some),
            None => Ok(None),
        }
    }

    /// Fetches the key set and replaces the cache entry wholesale.
    ///
    /// Public so callers can refresh proactively (e.g. on a timer).
    ///
    /// # Errors
    ///
    /// Returns an error if the URI scheme is not allowed, the HTTP request
    /// fails, or the response cannot be parsed as a JWK set.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        let _guard = self.refresh_guard.lock().await;
        self.fetch_and_store().await
    }

    /// Performs the fetch. Callers must hold `refresh_guard`.
    async fn fetch_and_store(&self) -> Result<(), JwksError> {
        self.validate_scheme()?;

        tracing::debug!(uri = %self.jwks_uri, "Fetching JWKS");

        let response = self
            .http_client
            .get(self.jwks_uri.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(uri = %self.jwks_uri, error = %e, "Failed to fetch JWKS");
                JwksError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(JwksError::Http(response.status().as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_response_size
        {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.config.max_response_size,
            });
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::warn!(uri = %self.jwks_uri, error = %e, "Failed to parse JWKS");
            JwksError::Parse(e.to_string())
        })?;

        tracing::debug!(
            uri = %self.jwks_uri,
            keys = jwks.keys.len(),
            ttl = ?self.config.ttl,
            "Cached JWKS"
        );

        let now = Instant::now();
        let mut cached = self.cached.write().await;
        *cached = Some(CachedJwks {
            jwks,
            fetched_at: now,
            expires_at: now + self.config.ttl,
        });

        Ok(())
    }

    /// Drops the cached key set, forcing the next lookup to fetch.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
        tracing::debug!("Invalidated JWKS cache");
    }

    /// Returns `true` if a fresh key set is currently cached.
    pub async fn is_fresh(&self) -> bool {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .is_some_and(|entry| Instant::now() < entry.expires_at)
    }

    /// Validates that the configured URI uses an allowed scheme.
    fn validate_scheme(&self) -> Result<(), JwksError> {
        let scheme = self.jwks_uri.scheme();

        if scheme == "https" {
            return Ok(());
        }

        if scheme == "http" && self.config.allow_http {
            return Ok(());
        }

        Err(JwksError::InvalidScheme)
    }
}

/// Finds a key by `kid` and converts it to a decoding key.
///
/// Returns `None` when the set has no such kid; `Some(Err(..))` when the
/// kid exists but the key material is unusable.
fn find_key(
    jwks: &JwkSet,
    kid: &str,
) -> Option<Result<(DecodingKey, Option<Algorithm>), JwksError>> {
    let jwk = jwks
        .keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))?;

    Some(
        DecodingKey::from_jwk(jwk)
            .map(|dk| (dk, jwk_algorithm(jwk)))
            .map_err(|e| JwksError::InvalidKey(e.to_string())),
    )
}

/// Extracts the algorithm from a JWK.
fn jwk_algorithm(jwk: &jsonwebtoken::jwk::Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        jsonwebtoken::jwk::KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        jsonwebtoken::jwk::KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        jsonwebtoken::jwk::KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        jsonwebtoken::jwk::KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        jsonwebtoken::jwk::KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        jsonwebtoken::jwk::KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        jsonwebtoken::jwk::KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        jsonwebtoken::jwk::KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        jsonwebtoken::jwk::KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = JwksCacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_response_size, 1024 * 1024);
        assert!(!config.allow_http);
    }

    #[test]
    fn test_config_builder() {
        let config = JwksCacheConfig::new()
            .with_ttl(Duration::from_secs(1800))
            .with_request_timeout(Duration::from_secs(5))
            .with_max_response_size(512 * 1024)
            .with_allow_http(true);

        assert_eq!(config.ttl, Duration::from_secs(1800));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_response_size, 512 * 1024);
        assert!(config.allow_http);
    }

    #[test]
    fn test_for_domain_builds_well_known_uri() {
        let cache =
            JwksCache::for_domain("tenant.auth.example.com", JwksCacheConfig::default()).unwrap();
        assert_eq!(
            cache.jwks_uri.as_str(),
            "https://tenant.auth.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_validate_scheme() {
        let https = Url::parse("https://example.com/jwks").unwrap();
        let cache = JwksCache::new(https, JwksCacheConfig::default());
        assert!(cache.validate_scheme().is_ok());

        let http = Url::parse("http://example.com/jwks").unwrap();
        let cache = JwksCache::new(http.clone(), JwksCacheConfig::default());
        assert!(matches!(
            cache.validate_scheme(),
            Err(JwksError::InvalidScheme)
        ));

        let cache = JwksCache::new(http, JwksCacheConfig::default().with_allow_http(true));
        assert!(cache.validate_scheme().is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_and_freshness() {
        let uri = Url::parse("https://example.com/jwks").unwrap();
        let cache = JwksCache::new(uri, JwksCacheConfig::default());

        assert!(!cache.is_fresh().await);

        {
            let mut cached = cache.cached.write().await;
            *cached = Some(CachedJwks {
                jwks: JwkSet { keys: vec![] },
                fetched_at: Instant::now(),
                expires_at: Instant::now() + Duration::from_secs(3600),
            });
        }
        assert!(cache.is_fresh().await);

        cache.invalidate().await;
        assert!(!cache.is_fresh().await);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let uri = Url::parse("https://example.com/jwks").unwrap();
        let cache = JwksCache::new(uri, JwksCacheConfig::default());

        {
            let mut cached = cache.cached.write().await;
            *cached = Some(CachedJwks {
                jwks: JwkSet { keys: vec![] },
                fetched_at: Instant::now() - Duration::from_secs(7200),
                expires_at: Instant::now() - Duration::from_secs(3600),
            });
        }

        assert!(!cache.is_fresh().await);
        assert!(cache.lookup("any").await.unwrap().is_none());
    }

    #[test]
    fn test_jwks_error_display() {
        let err = JwksError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = JwksError::Http(404);
        assert_eq!(err.to_string(), "HTTP error: status 404");

        let err = JwksError::KeyNotFound("key-1".to_string());
        assert_eq!(err.to_string(), "Key not found: key-1");

        let err = JwksError::ResponseTooLarge { max_size: 1024 };
        assert_eq!(
            err.to_string(),
            "Response exceeds maximum size of 1024 bytes"
        );
    }
}
