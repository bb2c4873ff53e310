use aeos_config::loader::load_config;

#[tokio::main]
async fn main() {
    // Load .env if present; environment variables may carry the provider
    // secrets for local development.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }

    let config_path = std::env::var("AEOS_CONFIG").ok();
    let config = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    aeos_server::init_tracing(&config.logging.level);
    tracing::info!(
        provider = %config.provider.domain,
        audience = %config.provider.audience,
        "Configuration loaded"
    );

    if let Err(e) = aeos_server::run(config).await {
        eprintln!("Server error: {e:#}");
        std::process::exit(1);
    }
}
