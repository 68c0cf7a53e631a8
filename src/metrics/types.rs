//! Snapshot and raw counter types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Sentinel for a CPU wait value the platform cannot provide.
pub const CPU_WAIT_UNAVAILABLE: f64 = -1.0;

/// One combined measurement, produced per tick and consumed once by the exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    /// CPU utilization percentage.
    pub cpu: f64,
    /// CPU iowait percentage, or `CPU_WAIT_UNAVAILABLE`.
    pub cpu_wait: f64,
    /// Memory utilization percentage.
    pub memory: f64,
    /// Keyed by device name; ordered so column derivation is deterministic.
    pub disks: BTreeMap<String, DiskStats>,
    /// Keyed by interface name.
    pub networks: BTreeMap<String, NetStats>,
}

impl Snapshot {
    /// Creates an empty snapshot stamped at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            cpu: 0.0,
            cpu_wait: CPU_WAIT_UNAVAILABLE,
            memory: 0.0,
            disks: BTreeMap::new(),
            networks: BTreeMap::new(),
        }
    }

    /// Returns true if the CPU wait value is a real measurement.
    pub fn has_cpu_wait(&self) -> bool {
        self.cpu_wait >= 0.0
    }
}

/// Disk I/O metrics for a single device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskStats {
    /// Percentage of wall time the device was busy, capped at 100.
    pub utilization: f64,
    /// Average time per I/O operation in milliseconds.
    pub await_ms: f64,
    /// Completed read + write operations per second.
    pub iops: f64,
}

/// Network metrics for a single interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetStats {
    /// Combined send + receive bandwidth in bits per second.
    pub bandwidth_bps: f64,
}

impl NetStats {
    /// Bandwidth in megabits per second, the unit used in record files.
    pub fn mbps(&self) -> f64 {
        self.bandwidth_bps / 1_000_000.0
    }
}

/// Accumulated CPU time buckets in seconds.
///
/// `captured_at` is `None` for a snapshot that was never filled in, which is how
/// the calculator recognises "no prior sample". A negative `iowait` means the
/// platform does not report it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub captured_at: Option<DateTime<Utc>>,
}

impl CpuTimes {
    /// Sum of all buckets that make up wall CPU time.
    ///
    /// An unsupported (negative) iowait does not count towards the total.
    pub fn total(&self) -> f64 {
        self.user
            + self.system
            + self.idle
            + self.iowait.max(0.0)
            + self.irq
            + self.softirq
            + self.steal
    }
}

/// Accumulated disk I/O counters for one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_count: u64,
    pub write_count: u64,
    /// Milliseconds spent reading.
    pub read_time_ms: u64,
    /// Milliseconds spent writing.
    pub write_time_ms: u64,
    /// Milliseconds the device had I/O in flight.
    pub busy_time_ms: u64,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Accumulated byte counters for one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub captured_at: Option<DateTime<Utc>>,
}
