//! # parley-server
//!
//! Development chat backend for Parley clients.
//!
//! This binary provides:
//! - a **WebSocket endpoint** (`/ws`) that authenticates a bearer token and
//!   relays every message envelope to all other connected clients
//! - **health and info** endpoints for probes and clients
//! - **per-connection message budgets** against floods

mod api;
mod auth;
mod chat;
mod config;
mod error;
mod hub;
mod rate_limit;

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
                .unwrap_or_else(|_| EnvFilter::new("info,parley_server=debug")),
        )
        .init();

    info!("Starting Parley chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.open_mode() {
        tracing::warn!("ACCEPTED_TOKENS not set, accepting any non-empty token");
    }

    let http_addr = config.http_addr;
    let app_state = AppState::new(config);

    // -----------------------------------------------------------------------
    // 3. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
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
