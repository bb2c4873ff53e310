//! Identity-provider management client.
//!
//! This module talks to the provider's HTTP endpoints on behalf of the
//! API:
//!
//! - **Token exchange** - password, authorization-code and refresh-token
//!   grants against `POST /oauth/token`, passed through with the
//!   provider's error classification preserved
//! - **User provisioning** - `POST /api/v2/users` with a management token
//! - **Management-token cache** - a client-credentials token for the
//!   administrative API, cached per process and refreshed before expiry
//!   with a 60-second safety margin
//!
//! The correctness-critical pieces are the token-caching discipline (a
//! cached token is never handed out past `expires_at - margin`, and
//! concurrent callers share one in-flight grant) and faithful error
//! classification (provider 4xx becomes a typed OAuth/conflict error, not
//! an opaque upstream failure).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Safety margin subtracted from the management token's lifetime.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Configuration for the management client.
#[derive(Debug, Clone)]
pub struct ManagementClientConfig {
    /// Base URL of the provider, normally `https://{domain}/`.
    pub base_url: Url,

    /// OAuth client id used for user-facing grants.
    pub client_id: String,

    /// OAuth client secret used for user-facing grants.
    pub client_secret: String,

    /// API audience requested on password and authorization-code grants.
    pub audience: String,

    /// Client id for the management (administrative) API.
    pub mgmt_client_id: String,

    /// Client secret for the management API.
    pub mgmt_client_secret: String,

    /// Audience of the management API.
    pub mgmt_audience: String,

    /// HTTP request timeout (default: 10 seconds).
    pub request_timeout: Duration,
}

impl ManagementClientConfig {
    /// Creates a configuration for the given provider base URL.
    #[must_use]
    pub fn new(
        base_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience: audience.into(),
            mgmt_client_id: String::new(),
            mgmt_client_secret: String::new(),
            mgmt_audience: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Builds a configuration from a provider domain.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the domain does not form a valid URL.
    pub fn for_domain(
        domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!("https://{domain}/"))?;
        Ok(Self::new(base_url, client_id, client_secret, audience))
    }

    /// Sets the management-API credentials.
    #[must_use]
    pub fn with_management_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        self.mgmt_client_id = client_id.into();
        self.mgmt_client_secret = client_secret.into();
        self.mgmt_audience = audience.into();
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> Url {
        // base_url always ends in "/" so join never rewrites the host
        self.base_url
            .join(path)
            .expect("provider endpoint path is valid")
    }
}

/// Errors from provider management and token-exchange calls.
#[derive(Debug, thiserror::Error)]
pub enum ManagementError {
    /// The provider reported the user already exists (HTTP 409).
    #[error("User already exists")]
    Conflict,

    /// The provider rejected a grant with an OAuth error body.
    #[error("OAuth error from provider: {error} - {description}")]
    OAuth {
        /// Provider HTTP status.
        status: u16,
        /// The OAuth error code (e.g. `invalid_grant`).
        error: String,
        /// Human-readable description from the provider.
        description: String,
    },

    /// The provider returned an unexpected non-success response.
    #[error("Provider error (status {status}): {message}")]
    Provider {
        /// Provider HTTP status.
        status: u16,
        /// The provider's message, retained for diagnostics.
        message: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider response could not be parsed.
    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl ManagementError {
    /// Returns `true` when the failure is attributable to the caller's
    /// credentials or input (provider 4xx) rather than the provider.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Conflict => true,
            Self::OAuth { status, .. } | Self::Provider { status, .. } => {
                (400..500).contains(status)
            }
            _ => false,
        }
    }
}

/// A token set returned by the provider's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token.
    pub access_token: String,

    /// The token type (usually "Bearer").
    pub token_type: String,

    /// Token lifetime in seconds.
    pub expires_in: Option<u64>,

    /// Optional refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Optional OIDC ID token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A grant request passed through to the provider's token endpoint.
#[derive(Debug, Clone)]
pub enum GrantRequest {
    /// Resource-owner password grant.
    Password {
        /// Username or email.
        username: String,
        /// The user's password.
        password: String,
    },
    /// Authorization-code grant.
    AuthorizationCode {
        /// The code returned by the provider callback.
        code: String,
        /// The redirect URI the code was issued for.
        redirect_uri: String,
    },
    /// Refresh-token grant.
    RefreshToken {
        /// The refresh token.
        refresh_token: String,
    },
}

impl GrantRequest {
    /// The wire value of `grant_type` for this request.
    #[must_use]
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// Profile sent to the provider's user-creation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct NewProviderUser {
    /// Email address.
    pub email: String,

    /// Initial password.
    pub password: String,

    /// Provider connection the user is created in.
    pub connection: String,

    /// Whether the email starts out verified.
    pub email_verified: bool,

    /// Optional full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NewProviderUser {
    /// Creates a profile for the default username/password connection.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            connection: "Username-Password-Authentication".to_string(),
            email_verified: false,
            name: None,
        }
    }

    /// Sets the user's full name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A user record returned by the provider's user-creation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUser {
    /// Provider-issued user id.
    pub user_id: String,

    /// Email address.
    pub email: Option<String>,

    /// Full name.
    pub name: Option<String>,

    /// Whether the email is verified.
    #[serde(default)]
    pub email_verified: bool,

    /// Creation timestamp as reported by the provider.
    pub created_at: Option<String>,
}

/// Cached management token.
struct CachedToken {
    access_token: String,
    expires_at: OffsetDateTime,
}

/// OAuth error body returned by the provider.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

/// Error body returned by the management user endpoint.
#[derive(Debug, Deserialize)]
struct ManagementErrorBody {
    message: Option<String>,
    description: Option<String>,
}

/// HTTP client for the provider's token and management endpoints.
pub struct ManagementClient {
    http_client: reqwest::Client,
    config: ManagementClientConfig,
    /// Cached management token; readers check expiry with the margin.
    token: RwLock<Option<CachedToken>>,
    /// Serializes management-token grants so concurrent callers share one.
    refresh_guard: Mutex<()>,
}

impl ManagementClient {
    /// Creates a new management client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: ManagementClientConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            config,
            token: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Returns a currently valid management token.
    ///
    /// The cached token is reused while `now < expires_at - 60s`;
    /// otherwise a client-credentials grant is performed and cached.
    /// Concurrent callers during a refresh share one grant request.
    ///
    /// # Errors
    ///
    /// Returns a [`ManagementError`] if the grant fails.
    pub async fn management_token(&self) -> Result<String, ManagementError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        tracing::debug!("Requesting new management token");

        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "client_id": self.config.mgmt_client_id,
            "client_secret": self.config.mgmt_client_secret,
            "audience": self.config.mgmt_audience,
        });

        let response = self
            .http_client
            .post(self.config.endpoint("oauth/token"))
            .json(&body)
            .send()
            .await?;

        let token_set = Self::parse_token_response(response).await?;

        // Default lifetime per the provider's documentation is 24 hours.
        let expires_in = token_set.expires_in.unwrap_or(86_400);
        let expires_at = OffsetDateTime::now_utc() + Duration::from_secs(expires_in);

        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            access_token: token_set.access_token.clone(),
            expires_at,
        });

        Ok(token_set.access_token)
    }

    /// Returns the cached token if it is still inside the safety margin.
    async fn cached_token(&self) -> Option<String> {
        let cached = self.token.read().await;
        cached.as_ref().and_then(|token| {
            if OffsetDateTime::now_utc() < token.expires_at - TOKEN_EXPIRY_MARGIN {
                Some(token.access_token.clone())
            } else {
                None
            }
        })
    }

    /// Creates a user on the provider via the management API.
    ///
    /// # Errors
    ///
    /// - [`ManagementError::Conflict`] if the provider responds 409
    /// - [`ManagementError::Provider`] for any other non-success response,
    ///   carrying the provider's message
    pub async fn create_user(&self, user: &NewProviderUser) -> Result<ProviderUser, ManagementError> {
        let token = self.management_token().await?;

        let response = self
            .http_client
            .post(self.config.endpoint("api/v2/users"))
            .bearer_auth(token)
            .json(user)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 409 {
            return Err(ManagementError::Conflict);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ManagementErrorBody>(&body)
                .ok()
                .map(|b| {
                    let msg = b.message.unwrap_or_else(|| "Unknown error".to_string());
                    match b.description {
                        Some(desc) if !desc.is_empty() => format!("{msg}: {desc}"),
                        _ => msg,
                    }
                })
                .unwrap_or(body);

            tracing::warn!(status = status.as_u16(), %message, "Provider user creation failed");
            return Err(ManagementError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let created: ProviderUser = response
            .json()
            .await
            .map_err(|e| ManagementError::Parse(e.to_string()))?;

        tracing::info!(user_id = %created.user_id, "Provisioned provider user");
        Ok(created)
    }

    /// Exchanges credentials at the provider's token endpoint.
    ///
    /// Password and authorization-code grants request the configured API
    /// audience with `openid profile email offline_access` scope, matching
    /// what the interactive flows expect; refresh-token grants pass the
    /// token through unchanged.
    ///
    /// # Errors
    ///
    /// 400-class provider responses with an OAuth error body become
    /// [`ManagementError::OAuth`]; everything else non-success becomes
    /// [`ManagementError::Provider`].
    pub async fn exchange(&self, grant: GrantRequest) -> Result<TokenSet, ManagementError> {
        let mut fields = serde_json::Map::new();
        fields.insert("grant_type".into(), grant.grant_type().into());
        fields.insert("client_id".into(), self.config.client_id.clone().into());
        fields.insert(
            "client_secret".into(),
            self.config.client_secret.clone().into(),
        );
        match &grant {
            GrantRequest::Password { username, password } => {
                fields.insert("username".into(), username.clone().into());
                fields.insert("password".into(), password.clone().into());
                fields.insert("audience".into(), self.config.audience.clone().into());
                fields.insert(
                    "scope".into(),
                    "openid profile email offline_access".into(),
                );
            }
            GrantRequest::AuthorizationCode { code, redirect_uri } => {
                fields.insert("code".into(), code.clone().into());
                fields.insert("redirect_uri".into(), redirect_uri.clone().into());
                fields.insert("audience".into(), self.config.audience.clone().into());
                fields.insert(
                    "scope".into(),
                    "openid profile email offline_access".into(),
                );
            }
            GrantRequest::RefreshToken { refresh_token } => {
                fields.insert("refresh_token".into(), refresh_token.clone().into());
            }
        }

        tracing::debug!(grant_type = grant.grant_type(), "Exchanging credentials");

        let response = self
            .http_client
            .post(self.config.endpoint("oauth/token"))
            .json(&serde_json::Value::Object(fields))
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    /// Parses a token-endpoint response, classifying failures.
    ///
    /// Only 4xx responses count as credential rejections. A 5xx is a
    /// provider failure even when it carries an OAuth-shaped body.
    async fn parse_token_response(response: reqwest::Response) -> Result<TokenSet, ManagementError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.is_client_error()
                && let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(&body)
            {
                return Err(ManagementError::OAuth {
                    status: status.as_u16(),
                    error: oauth.error,
                    description: oauth.error_description.unwrap_or_default(),
                });
            }

            return Err(ManagementError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ManagementError::Parse(e.to_string()))
    }
}
