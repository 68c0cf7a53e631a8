//! Operating-system counter sources.
//!
//! Samplers never talk to the OS directly; they go through a `CounterSource`,
//! which returns raw accumulated counters. The `/proc` implementation is the
//! production source, tests substitute their own.

pub mod procfs;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::metrics::{CpuTimes, DiskCounters, NetCounters};

pub use procfs::ProcfsSource;

/// Errors raised while reading raw counters.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("no {0} statistics available")]
    Empty(&'static str),
}

/// Physical memory totals in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    /// Used memory as a percentage of total.
    pub fn utilization(&self) -> Result<f64, SourceError> {
        if self.total_bytes == 0 {
            return Err(SourceError::Parse {
                what: "memory",
                detail: "total memory is zero".to_string(),
            });
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        Ok(used as f64 / self.total_bytes as f64 * 100.0)
    }
}

/// A provider of raw, monotonically increasing resource counters.
///
/// Returned counters carry no capture time; the sampler stamps them.
pub trait CounterSource: Send + Sync {
    /// Aggregate CPU time buckets across all cores, in seconds.
    fn cpu_times(&self) -> Result<CpuTimes, SourceError>;

    /// Current physical memory totals.
    fn memory(&self) -> Result<MemoryInfo, SourceError>;

    /// Per-device disk counters keyed by device name (no `/dev/` prefix).
    fn disk_counters(&self) -> Result<BTreeMap<String, DiskCounters>, SourceError>;

    /// Per-interface byte counters keyed by interface name.
    fn net_counters(&self) -> Result<BTreeMap<String, NetCounters>, SourceError>;
}
