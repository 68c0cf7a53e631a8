//! Collect command implementation.
//!
//! Runs the collection manager and the CSV exporter until SIGINT/SIGTERM.

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::startup_checks;
use unostat::{
    Capabilities, CollectorManager, Config, CounterSource, CsvExporter, PipelineStats,
    ProcfsSource, QUEUE_CAPACITY,
};

/// Collects metrics into the configured CSV file until `shutdown` fires.
pub async fn command_collect(
    config: &Config,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let capabilities = Capabilities::current();
    capabilities.log_summary();

    let source: Arc<dyn CounterSource> = Arc::new(ProcfsSource::new());
    let export_settings = config.export_settings();

    if let Err(e) = startup_checks::validate_requirements(source.as_ref(), &export_settings.path)
    {
        error!("❌ Startup validation failed: {}", e);
        error!("   Collection will start but rows may be incomplete!");
    }

    let stats = Arc::new(PipelineStats::new());

    // Open the sink first: a bad output path or timezone is fatal.
    let exporter = CsvExporter::new(export_settings, Arc::clone(&stats))
        .context("Failed to open CSV output")?;
    info!("Writing metrics to {}", exporter.current_path().display());

    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let manager = CollectorManager::new(
        config.collector_settings(),
        source,
        tx,
        Arc::clone(&stats),
    );

    let exporter_task = tokio::spawn(exporter.run(rx, shutdown.clone()));
    let manager_task = tokio::spawn(manager.run(shutdown.clone()));

    // The manager owns the only sender; once it returns the queue closes and
    // the exporter drains what is left.
    if let Err(e) = manager_task.await {
        error!("Collection manager task failed: {}", e);
        shutdown.cancel();
    }

    match exporter_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Failed to close CSV output: {}", e),
        Err(e) => error!("CSV exporter task failed: {}", e),
    }

    info!("Pipeline statistics: {}", stats.summary_line());
    Ok(())
}
