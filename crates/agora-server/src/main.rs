//! Server entry point for the Agora forum backend.
//!
//! Wires one store, one fan-out bus, and one typing tracker into the Axum
//! API, spawns the presence sweeper, and serves until interrupted.
//!
//! # Architecture
//!
//! ```text
//! HTTP/WS/SSE --> agora-api --> agora-core services --> agora-db store
//!                       \------ EventBus broadcast ------/
//! ```

mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use agora_api::{AppState, ServerConfig, start_server};
use agora_core::bus::EventBus;
use agora_core::presence::TypingTracker;
use agora_core::store::Store;
use agora_db::{MemoryStore, PgStore, PostgresPool};

use crate::config::{AgoraConfig, StoreBackend};

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// connects the storage backend, starts the presence sweeper, then serves
/// the API until the process is interrupted.
///
/// # Errors
///
/// Returns an error if initialization or the server loop fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("agora-server starting");

    // Load configuration from environment
    let config = AgoraConfig::from_env()?;
    info!(
        host = config.host,
        port = config.port,
        backend = ?config.backend,
        "configuration loaded"
    );

    // Connect the storage backend
    let store: Arc<dyn Store> = match config.backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
            let pool = PostgresPool::connect_url(url).await?;
            pool.run_migrations().await?;
            Arc::new(PgStore::new(&pool))
        }
        StoreBackend::Memory => {
            info!("running over the in-memory store; state is not persisted");
            Arc::new(MemoryStore::new())
        }
    };

    // The process-wide bus and the typing tracker with its sweeper
    let bus = Arc::new(EventBus::new());
    let typing = Arc::new(TypingTracker::new(Arc::clone(&bus)));
    let sweeper = tokio::spawn(Arc::clone(&typing).run_sweeper());
    info!("typing presence sweeper started");

    let state = Arc::new(AppState::new(store, bus, Arc::clone(&typing)));

    let server_config = ServerConfig {
        host: config.host,
        port: config.port,
    };

    // Serve until killed or interrupted.
    tokio::select! {
        result = start_server(&server_config, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    // Stop the background sweep before exiting.
    typing.shutdown();
    let _ = sweeper.await;
    info!("agora-server stopped");

    Ok(())
}
