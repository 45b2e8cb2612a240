//! # waboard-server
//!
//! HTTP backend for the waboard WhatsApp Business messaging console.
//!
//! This binary provides:
//! - **REST API** (axum) for sending single, bulk, and template messages
//!   through the Meta Graph API
//! - **Inbox** listing and read-state updates over the webhook message store
//! - **Conversation ledger** rollups per counterparty phone number
//! - **Media relay** that inlines provider media as data URLs
//! - **Maintenance sweep** deleting uploaded-media rows past retention

mod api;
mod config;
mod dispatch;
mod error;
mod ingest;
mod relay;
mod sweep;
mod webhook;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,waboard_server=debug")),
        )
        .init();

    info!("Starting waboard server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        http_addr = %config.http_addr,
        graph_base_url = %config.graph_base_url,
        graph_api_version = %config.graph_api_version,
        sweep_enabled = config.cron_secret.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database and build shared state
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let state = AppState::open(config, None)?;

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
