//! Record-file export sink.
//!
//! A single consumer drains the snapshot queue into a CSV file. Rows are
//! buffered and flushed on a record count, on a timer, and at shutdown. Once
//! the tracked size reaches the rotation threshold the file is flushed and a
//! new sibling file `<base>_<n><ext>` is started with a fresh header.

pub mod schema;
pub mod timezone;

pub use schema::{ColumnSchema, NOT_AVAILABLE};
pub use timezone::{OutputZone, TIMESTAMP_FORMAT};

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::metrics::Snapshot;
use crate::stats::PipelineStats;
use schema::record_size;

/// Default size at which the output file is rotated.
pub const DEFAULT_ROTATE_BYTES: u64 = 150 * 1024 * 1024;

/// Write buffer in front of the output file.
const WRITE_BUFFER_BYTES: usize = 8192;

/// Errors raised by the export sink.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid timezone '{name}': {reason}")]
    InvalidTimezone { name: String, reason: String },

    #[error("failed to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write record: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush output: {0}")]
    Flush(#[source] std::io::Error),

    #[error("failed to rotate to {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Export sink settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub path: PathBuf,
    /// Records written before a forced flush.
    pub buffer_size: usize,
    pub flush_interval: Duration,
    pub rotate_bytes: u64,
    pub timezone: String,
}

impl ExportSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: 100,
            flush_interval: Duration::from_secs(5),
            rotate_bytes: DEFAULT_ROTATE_BYTES,
            timezone: "Local".to_string(),
        }
    }
}

/// Returns the first `<base>_<n><ext>` sibling of `base` with `n > after`
/// that does not exist yet, along with `n`.
pub fn next_rotation_path(base: &Path, after: usize) -> (PathBuf, usize) {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut index = after;
    loop {
        index += 1;
        let candidate = base.with_file_name(format!("{}_{}{}", stem, index, ext));
        if !candidate.exists() {
            return (candidate, index);
        }
    }
}

fn csv_writer(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new()
        .buffer_capacity(WRITE_BUFFER_BYTES)
        .flexible(true)
        .from_writer(file)
}

/// Buffered, rotating CSV writer for snapshots.
pub struct CsvExporter {
    settings: ExportSettings,
    zone: OutputZone,
    writer: csv::Writer<File>,
    current_path: PathBuf,
    file_index: usize,
    current_size: u64,
    schema: Option<ColumnSchema>,
    pending: usize,
    stats: Arc<PipelineStats>,
}

impl CsvExporter {
    /// Resolves the timezone and opens the output file in append mode.
    ///
    /// Both failures are fatal: nothing is written with a bad zone.
    pub fn new(settings: ExportSettings, stats: Arc<PipelineStats>) -> Result<Self, ExportError> {
        let zone = OutputZone::resolve(&settings.timezone)?;

        let open_err = |source| ExportError::Open {
            path: settings.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.path)
            .map_err(open_err)?;
        let current_size = file.metadata().map_err(open_err)?.len();

        Ok(Self {
            current_path: settings.path.clone(),
            settings,
            zone,
            writer: csv_writer(file),
            file_index: 0,
            current_size,
            schema: None,
            pending: 0,
            stats,
        })
    }

    /// File currently being written.
    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Tracked size of the current file in bytes.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn zone(&self) -> OutputZone {
        self.zone
    }

    /// Appends one row, writing the header first if this file has none yet
    /// and rotating beforehand if the size threshold was reached.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), ExportError> {
        let mut schema = self.schema.take();

        if self.current_size >= self.settings.rotate_bytes {
            match self.rotate(snapshot) {
                Ok(rotated) => schema = Some(rotated),
                Err(e) => {
                    // Keep appending to the current file
                    error!("Failed to rotate output file: {}", e);
                }
            }
        }

        // Checked after rotation so an oversized file never gets a header
        let schema = match schema {
            Some(schema) => schema,
            None => {
                let schema = ColumnSchema::from_snapshot(snapshot);
                self.write_header(&schema)?;
                schema
            }
        };

        let row = schema.row(snapshot, &self.zone);
        self.schema = Some(schema);

        self.writer.write_record(&row)?;
        self.current_size += record_size(&row);
        self.stats.record_row_written();
        Ok(())
    }

    /// Pushes buffered rows to the file.
    pub fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.flush().map_err(ExportError::Flush)?;
        self.stats.record_flush();
        debug!(records = self.pending, "Flushed to disk");
        self.pending = 0;
        Ok(())
    }

    /// Final flush, then closes the file.
    pub fn close(mut self) -> Result<(), ExportError> {
        info!("Closing CSV exporter");
        let result = self.flush();
        if let Err(e) = &result {
            error!("Final flush failed: {}", e);
        }
        drop(self.writer);
        info!("CSV exporter closed");
        result
    }

    /// Only row bytes count towards the rotation threshold.
    fn write_header(&mut self, schema: &ColumnSchema) -> Result<(), ExportError> {
        self.writer.write_record(schema.header())?;
        Ok(())
    }

    /// Flushes the current file and switches to the next unused sibling path.
    /// On failure the current file stays open.
    fn rotate(&mut self, snapshot: &Snapshot) -> Result<ColumnSchema, ExportError> {
        info!(current_size = self.current_size, "Rotating output file");
        self.flush()?;

        let (path, index) = next_rotation_path(&self.settings.path, self.file_index);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| ExportError::Rotate {
                path: path.clone(),
                source,
            })?;

        // Dropping the old writer closes the previous file
        self.writer = csv_writer(file);
        self.file_index = index;
        self.current_path = path;
        self.current_size = 0;

        let schema = ColumnSchema::from_snapshot(snapshot);
        self.write_header(&schema)?;

        self.stats.record_rotation();
        info!(new_path = %self.current_path.display(), "File rotated successfully");
        Ok(schema)
    }

    fn handle(&mut self, snapshot: Snapshot) {
        if let Err(e) = self.write_snapshot(&snapshot) {
            self.stats.record_write_failure();
            error!("Failed to write snapshot: {}", e);
        }

        self.pending += 1;
        if self.pending >= self.settings.buffer_size {
            self.flush_logged();
        }
    }

    fn flush_logged(&mut self) {
        if let Err(e) = self.flush() {
            self.stats.record_write_failure();
            error!("Failed to flush: {}", e);
        }
    }

    /// Consumes the queue until it closes or `cancel` fires.
    ///
    /// After cancellation the queue is drained to its end (the producer closes
    /// it when it stops), then the file is flushed and closed.
    #[instrument(skip_all, name = "exporter")]
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Snapshot>,
        cancel: CancellationToken,
    ) -> Result<(), ExportError> {
        info!(
            output = %self.current_path.display(),
            timezone = %self.zone.name(),
            "Starting CSV exporter"
        );

        let flush_interval = self.settings.flush_interval;
        let mut flush_ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + flush_interval, flush_interval);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(snapshot) => self.handle(snapshot),
                    None => {
                        info!("Metrics queue closed, flushing remaining data");
                        break;
                    }
                },
                _ = flush_ticker.tick() => {
                    if self.pending > 0 {
                        self.flush_logged();
                    }
                }
                _ = cancel.cancelled() => {
                    info!("CSV exporter stopping, draining queue");
                    while let Some(snapshot) = rx.recv().await {
                        self.handle(snapshot);
                    }
                    break;
                }
            }
        }

        self.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DiskStats, NetStats};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::fs;

    fn snapshot(offset_secs: i64) -> Snapshot {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + ChronoDuration::seconds(offset_secs);
        let mut snapshot = Snapshot::new(ts);
        snapshot.cpu = 10.0;
        snapshot.cpu_wait = 1.5;
        snapshot.memory = 40.0;
        snapshot.disks.insert("sda".to_string(), DiskStats::default());
        snapshot.networks.insert(
            "eth0".to_string(),
            NetStats {
                bandwidth_bps: 2_000_000.0,
            },
        );
        snapshot
    }

    fn settings(path: &Path) -> ExportSettings {
        let mut settings = ExportSettings::new(path);
        settings.timezone = "UTC".to_string();
        settings
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut exporter = CsvExporter::new(settings(&path), Arc::new(PipelineStats::new())).unwrap();

        exporter.write_snapshot(&snapshot(0)).unwrap();
        exporter.write_snapshot(&snapshot(30)).unwrap();
        exporter.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp,CPU Utilization (%)"));
        assert_eq!(
            lines[1],
            "2024-01-01 00:00:00,10.00,1.50,40.00,0.00,0.00,0.00,2.00"
        );
        assert!(lines[2].starts_with("2024-01-01 00:00:30,"));
    }

    #[test]
    fn test_unavailable_cpu_wait() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut exporter = CsvExporter::new(settings(&path), Arc::new(PipelineStats::new())).unwrap();

        let mut snap = snapshot(0);
        snap.cpu_wait = -1.0;
        exporter.write_snapshot(&snap).unwrap();
        exporter.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.lines().nth(1).unwrap().contains(",N/A,"));
    }

    #[test]
    fn test_invalid_timezone_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&dir.path().join("out.csv"));
        settings.timezone = "Not/AZone".to_string();

        let result = CsvExporter::new(settings, Arc::new(PipelineStats::new()));
        assert!(matches!(result, Err(ExportError::InvalidTimezone { .. })));
    }

    #[test]
    fn test_append_mode_tracks_existing_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "existing\n").unwrap();

        let exporter = CsvExporter::new(settings(&path), Arc::new(PipelineStats::new())).unwrap();
        assert_eq!(exporter.current_size(), 9);
    }

    #[test]
    fn test_next_rotation_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("metrics.csv");
        fs::write(dir.path().join("metrics_1.csv"), "old").unwrap();

        let (path, index) = next_rotation_path(&base, 0);
        assert_eq!(path, dir.path().join("metrics_2.csv"));
        assert_eq!(index, 2);

        let (path, _) = next_rotation_path(&dir.path().join("noext"), 0);
        assert_eq!(path, dir.path().join("noext_1"));
    }

    #[test]
    fn test_rotation_writes_fresh_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut settings = settings(&path);
        settings.rotate_bytes = 1;
        let stats = Arc::new(PipelineStats::new());
        let mut exporter = CsvExporter::new(settings, Arc::clone(&stats)).unwrap();

        exporter.write_snapshot(&snapshot(0)).unwrap();
        let mut second = snapshot(30);
        second.disks.insert("sdb".to_string(), DiskStats::default());
        exporter.write_snapshot(&second).unwrap();
        assert_eq!(exporter.current_path(), dir.path().join("out_1.csv"));
        exporter.close().unwrap();

        let rotated = fs::read_to_string(dir.path().join("out_1.csv")).unwrap();
        let lines: Vec<&str> = rotated.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Disk [sdb] Utilization (%)"));
        assert_eq!(stats.rotations.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
