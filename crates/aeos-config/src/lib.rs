//! Configuration loading for the AEOS API.
//!
//! Settings come from an optional `aeos.toml` file merged with environment
//! variables prefixed `AEOS__` (double underscore as the section
//! separator, e.g. `AEOS__SERVER__PORT=9090`). Provider secrets are
//! expected to arrive via the environment in production.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.provider.domain.is_empty() {
            return Err("provider.domain is required".into());
        }
        if self.provider.domain.contains("://") {
            return Err("provider.domain must be a bare hostname, not a URL".into());
        }
        if self.provider.audience.is_empty() {
            return Err("provider.audience is required".into());
        }
        if self.provider.algorithms.is_empty() {
            return Err("provider.algorithms must name at least one algorithm".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// The socket address to bind.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port (default: 8000).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Identity-provider settings.
///
/// `Debug` redacts the secrets so the struct can be logged safely.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider domain, e.g. `tenant.auth.example.com`. A bare hostname;
    /// the issuer and JWKS URL are derived from it.
    #[serde(default)]
    pub domain: String,

    /// OAuth client id for user-facing grants.
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret for user-facing grants.
    #[serde(default)]
    pub client_secret: String,

    /// Expected `aud` claim on access tokens.
    #[serde(default)]
    pub audience: String,

    /// Accepted signing algorithms (default: `["RS256"]`).
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,

    /// Client id for the management API.
    #[serde(default)]
    pub mgmt_client_id: String,

    /// Client secret for the management API.
    #[serde(default)]
    pub mgmt_client_secret: String,

    /// Audience of the management API.
    #[serde(default)]
    pub mgmt_audience: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            audience: String::new(),
            algorithms: default_algorithms(),
            mgmt_client_id: String::new(),
            mgmt_client_secret: String::new(),
            mgmt_audience: String::new(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("algorithms", &self.algorithms)
            .field("mgmt_client_id", &self.mgmt_client_id)
            .field("mgmt_client_secret", &"<redacted>")
            .field("mgmt_audience", &self.mgmt_audience)
            .finish()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Base log level (default: `info`). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

pub mod loader {
    //! Builds an [`AppConfig`](super::AppConfig) from file and environment
    //! sources.

    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::AppConfig;

    /// Loads configuration from the given path (or `aeos.toml` when absent)
    /// with `AEOS__`-prefixed environment overrides, then validates it.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if the sources cannot be merged,
    /// deserialized, or fail validation.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();

        let file = PathBuf::from(path.unwrap_or("aeos.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }

        // Environment overrides, e.g. AEOS__PROVIDER__DOMAIN=...
        builder = builder.add_source(
            Environment::with_prefix("AEOS")
                .try_parsing(true)
                .separator("__"),
        );

        let merged: AppConfig = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;

        merged.validate()?;
        Ok(merged)
    }
}
