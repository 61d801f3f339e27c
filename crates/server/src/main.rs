//! linkmeta server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport and
//! the background fetch worker. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use linkmeta_core::{AppConfig, CacheDb, TracingMetrics};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
#[cfg(test)]
mod testing;
mod tools;
mod worker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open store at {}", config.db_path.display()))?;

    let state = Arc::new(state::AppState::from_config(&config, db, Arc::new(TracingMetrics::default()))?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = if config.worker_enabled {
        let worker = worker::Worker::new(state.clone(), config.worker_poll_interval());
        Some(tokio::spawn(worker.run(shutdown_rx)))
    } else {
        tracing::info!("fetch worker disabled; jobs are left for external workers");
        None
    };

    tracing::info!(db = %config.db_path.display(), "Starting linkmeta server on stdio transport");

    let handler = handler::LinkmetaServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    tokio::select! {
        result = server.waiting() => { result?; }
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    let _ = shutdown_tx.send(true);
    if let Some(worker) = worker {
        worker.await.context("fetch worker panicked")?;
    }

    Ok(())
}
