//! Per-resource samplers and the collection manager.
//!
//! Each sampler owns the previous raw counters for its resource. The first
//! call to `collect` only stores a baseline and reports `None` (or the
//! resource's zero value); later calls return deltas against the stored
//! baseline and replace it.

pub mod cpu;
pub mod disk;
pub mod filter;
pub mod manager;
pub mod memory;
pub mod network;

pub use cpu::{CpuReading, CpuSampler};
pub use disk::DiskSampler;
pub use filter::{normalize_device, DeviceFilter};
pub use manager::{
    try_publish, CollectorManager, CollectorSettings, SamplerSet, DEFAULT_STARTUP_DELAY,
    QUEUE_CAPACITY,
};
pub use memory::MemorySampler;
pub use network::{is_loopback, NetworkSampler};

use chrono::{DateTime, Utc};

use crate::source::SourceError;

/// A per-resource sampler.
pub trait Sampler: Send {
    type Output;

    /// Resource name used in log messages.
    fn name(&self) -> &'static str;

    /// Samples the resource with the capture time set to `now`.
    fn collect_at(&mut self, now: DateTime<Utc>) -> Result<Self::Output, SourceError>;

    /// Samples the resource at the current wall-clock time.
    fn collect(&mut self) -> Result<Self::Output, SourceError> {
        self.collect_at(Utc::now())
    }
}
