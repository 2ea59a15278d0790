//! Forwarder relay service.
//!
//! Main entry point for a federation relay node. Loads configuration,
//! initializes tracing and serves the forwarding hooks until shutdown.

use anyhow::{Context, Result};
use forwarder_api::{start_server, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize tracing with structured logging
    init_tracing(&config.rust_log)?;

    info!("Starting forwarder relay");

    let addr = config.parse_server_addr()?;
    let endpoints: Vec<&str> = config.destinations.iter().map(|d| d.endpoint.as_str()).collect();
    info!(
        server_addr = %addr,
        base_url = %config.base_url,
        destinations = ?endpoints,
        forward_timeout_seconds = config.forward_timeout_seconds,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config)?;

    start_server(state, addr).await.context("Server failed")?;

    info!("Forwarder shutdown complete");
    Ok(())
}

/// Initializes tracing with the configured filter directives.
fn init_tracing(directives: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter: {directives}"))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}
