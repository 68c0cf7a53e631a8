//! Visualize command implementation.
//!
//! Serves recorded CSV files through the JSON API until SIGINT/SIGTERM.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::handlers;
use crate::state::{scan_upload_dir, AppState};
use unostat::{Config, TimeSeriesStore};

/// Runs the visualization server.
pub async fn command_visualize(config: &Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let upload_dir = config.upload_dir();
    let store = Arc::new(TimeSeriesStore::new());

    let registered = scan_upload_dir(&store, &upload_dir).with_context(|| {
        format!("Failed to prepare upload directory {}", upload_dir.display())
    })?;
    info!(
        "Registered {} existing files from {}",
        registered,
        upload_dir.display()
    );

    let state = Arc::new(AppState::new(store, upload_dir));
    let app = handlers::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind(), config.port())
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.bind(), config.port()))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("unostat visualizer listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")?;

    info!("unostat visualizer stopped gracefully");
    Ok(())
}
