//! Atrium server
//!
//! Serves tenant entity routes and central registry administration over
//! HTTP, with one isolated SQLite store per tenant.

use atrium_persistence::tenant::CentralRegistry;
use atrium_rest::{AppState, ServerConfig, create_app, init_logging};
use clap::Parser;
use tracing::{info, warn};

/// Starts the Axum HTTP server and runs until Ctrl+C.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        data_dir = %config.data_dir.display(),
        in_memory = config.in_memory,
        central_domains = %config.central_domains,
        "Starting Atrium server"
    );

    let state = AppState::open(&config).await?;

    let tenants = state.registry().list_tenants().await?;
    let suspended = tenants.iter().filter(|t| !t.active).count();
    info!(
        tenants = tenants.len(),
        suspended,
        entities = state.catalog().len(),
        "Central registry loaded"
    );

    let app = create_app(state);
    serve(app, &config).await
}
