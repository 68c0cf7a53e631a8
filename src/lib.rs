//! unostat - resource utilization telemetry agent
//!
//! Samples CPU, memory, disk and network counters on a fixed interval, turns
//! them into rates via delta sampling, and appends the results to rotated CSV
//! record files. A separate in-memory store loads those files back for range
//! queries and downsampled visualization.
//!
//! # Pipeline
//!
//! ```text
//! CounterSource -> samplers -> CollectorManager -> bounded queue -> CsvExporter -> *.csv
//!                                                                     *.csv -> TimeSeriesStore
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use unostat::{CollectorManager, CollectorSettings, CsvExporter, ExportSettings};
//! use unostat::{PipelineStats, ProcfsSource, QUEUE_CAPACITY};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = Arc::new(PipelineStats::new());
//! let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
//! let cancel = CancellationToken::new();
//!
//! let exporter = CsvExporter::new(ExportSettings::new("metrics.csv"), Arc::clone(&stats))?;
//! let manager = CollectorManager::new(
//!     CollectorSettings::new(std::time::Duration::from_secs(30)),
//!     Arc::new(ProcfsSource::new()),
//!     tx,
//!     Arc::clone(&stats),
//! );
//!
//! let sink = tokio::spawn(exporter.run(rx, cancel.clone()));
//! manager.run(cancel).await;
//! sink.await??;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod exporter;
pub mod metrics;
pub mod platform;
pub mod source;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use collector::{CollectorManager, CollectorSettings, DeviceFilter, SamplerSet, QUEUE_CAPACITY};
pub use config::{Config, ConfigError};
pub use exporter::{CsvExporter, ExportError, ExportSettings, OutputZone};
pub use metrics::{DiskStats, NetStats, Snapshot};
pub use platform::Capabilities;
pub use source::{CounterSource, ProcfsSource, SourceError};
pub use stats::PipelineStats;
pub use store::{DataPoint, FileEntry, StoreError, StoreLimits, TimeRange, TimeSeriesStore};
