//! Server assembly: wires configuration into application state, applies
//! the HTTP middleware stack, and runs the listener with graceful
//! shutdown.

use std::sync::Arc;

use aeos_api::AppState;
use aeos_auth::{
    JwksCache, JwksCacheConfig, ManagementClient, ManagementClientConfig, TokenVerifier,
    VerifierConfig,
};
use aeos_config::AppConfig;
use aeos_storage::{Item, MemoryRepository, UserRecord};
use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use jsonwebtoken::Algorithm;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without touching configuration files.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds application state from configuration.
///
/// # Errors
///
/// Returns an error if the provider domain cannot form valid URLs or an
/// algorithm name is unknown.
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let provider = &config.provider;

    let algorithms = provider
        .algorithms
        .iter()
        .map(|name| {
            name.parse::<Algorithm>()
                .map_err(|_| anyhow::anyhow!("unknown signing algorithm: {name}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let jwks = JwksCache::for_domain(&provider.domain, JwksCacheConfig::default())
        .context("invalid provider domain")?;
    let verifier = TokenVerifier::new(
        VerifierConfig::new(&provider.domain, &provider.audience).with_algorithms(algorithms),
        Arc::new(jwks),
    );

    let management = ManagementClient::new(
        ManagementClientConfig::for_domain(
            &provider.domain,
            &provider.client_id,
            &provider.client_secret,
            &provider.audience,
        )
        .context("invalid provider domain")?
        .with_management_credentials(
            &provider.mgmt_client_id,
            &provider.mgmt_client_secret,
            &provider.mgmt_audience,
        ),
    );

    Ok(AppState::new(
        Arc::new(verifier),
        Arc::new(management),
        Arc::new(MemoryRepository::<Item>::new()),
        Arc::new(MemoryRepository::<UserRecord>::new()),
    ))
}

/// Builds the full application router with middleware applied.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header
/// value.
pub fn build_app(state: AppState, config: &AppConfig) -> anyhow::Result<Router> {
    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins = config
            .server
            .cors_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS origin: {origin}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Ok(aeos_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Runs the server until interrupted.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let app = build_app(state, &config)?;

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, provider = %config.provider.domain, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
