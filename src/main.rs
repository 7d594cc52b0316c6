use anyhow::Result;
use llama_relay::config::{RelayConfig, SERVER_TIMEOUT, UPSTREAM_TIMEOUT};
use llama_relay::server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env();
    report_configuration(&config);

    server::serve(config).await
}

/// Startup environment report. Misconfiguration is a loud warning, not a
/// startup failure: the diagnostics routes must answer either way, and the
/// completion path reports the gap per request.
fn report_configuration(config: &RelayConfig) {
    info!("llama-relay {} starting", llama_relay::version());
    info!("PORT: {}", config.port);
    info!("API timeout: {}ms", UPSTREAM_TIMEOUT.as_millis());
    info!("server timeout: {}ms", SERVER_TIMEOUT.as_millis());
    info!("FRONTEND_URL: {}", config.frontend_origin);

    match &config.endpoint {
        Some(_) => info!("LLAMA_API_ENDPOINT: {}", config.endpoint_preview()),
        None => warn!("LLAMA_API_ENDPOINT: NOT SET"),
    }

    match &config.api_key {
        Some(key) => info!("LLAMA_API_KEY: {}", key.preview()),
        None => warn!("LLAMA_API_KEY: NOT SET"),
    }

    match &config.deploy_name {
        Some(name) => info!("DEPLOY_NAME: {}", name),
        None => info!("DEPLOY_NAME: not set (optional)"),
    }
}
