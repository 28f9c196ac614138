//! # studybuddy-server
//!
//! HTTP backend for the StudyBuddy matching application.
//!
//! This binary provides:
//! - **Profile persistence** that triggers match derivation on every save
//! - **Inbox threads** with the viewing-marks-read policy
//! - **Reviews listing** with filtering, sorting and aggregate statistics
//! - **REST API** (axum) over a SQLite entity store

mod api;
mod config;
mod error;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use studybuddy_shared::constants::APP_NAME;
use studybuddy_store::Database;

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
                .unwrap_or_else(|_| EnvFilter::new("info,studybuddy_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the entity store
    // -----------------------------------------------------------------------
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    let state = AppState {
        db: Arc::new(Mutex::new(db)),
    };

    // -----------------------------------------------------------------------
    // 4. Serve the REST API
    // -----------------------------------------------------------------------
    let router = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP API listening");

    axum::serve(listener, router).await?;

    Ok(())
}
