//! Metric data model and delta calculations.
//!
//! Raw counter snapshots (`CpuTimes`, `DiskCounters`, `NetCounters`) are what the
//! samplers read from the operating system. The calculator turns two of them
//! into rates and percentages, and the results travel through the pipeline as a
//! `Snapshot`.

pub mod calculator;
pub mod types;

pub use calculator::{
    cpu_iowait, cpu_utilization, disk_await, disk_iops, disk_utilization, network_bandwidth,
};
pub use types::{CpuTimes, DiskCounters, DiskStats, NetCounters, NetStats, Snapshot, CPU_WAIT_UNAVAILABLE};
