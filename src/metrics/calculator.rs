//! Delta calculations between two counter snapshots.
//!
//! Every function here is total: missing history, stalled clocks and counter
//! resets produce a documented baseline value instead of an error.

use chrono::{DateTime, Utc};

use super::types::{CpuTimes, DiskCounters, NetCounters, CPU_WAIT_UNAVAILABLE};

/// Maximum reported disk utilization.
const MAX_UTILIZATION: f64 = 100.0;

/// Elapsed wall time between two captures in milliseconds, if both exist.
fn elapsed_ms(prev: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> Option<i64> {
    Some((current? - prev?).num_milliseconds())
}

/// Elapsed wall time between two captures in fractional seconds, if both exist.
fn elapsed_seconds(prev: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> Option<f64> {
    let delta = current? - prev?;
    let seconds = match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1_000_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    };
    Some(seconds)
}

/// CPU utilization percentage: `100 * (1 - Δidle / Δtotal)`.
///
/// Returns 0 without a prior sample or when the counters did not advance.
/// A regressed idle counter counts as no idle time.
pub fn cpu_utilization(prev: &CpuTimes, current: &CpuTimes) -> f64 {
    if prev.captured_at.is_none() {
        return 0.0;
    }

    let delta_total = current.total() - prev.total();
    if delta_total <= 0.0 {
        return 0.0;
    }
    let delta_idle = (current.idle - prev.idle).clamp(0.0, delta_total);

    100.0 * (1.0 - delta_idle / delta_total)
}

/// CPU iowait percentage: `100 * Δiowait / Δtotal`.
///
/// Returns `CPU_WAIT_UNAVAILABLE` without a prior sample or when the platform
/// reports iowait as unsupported (negative), and 0 when the counters did not
/// advance.
pub fn cpu_iowait(prev: &CpuTimes, current: &CpuTimes) -> f64 {
    if prev.captured_at.is_none() || current.iowait < 0.0 {
        return CPU_WAIT_UNAVAILABLE;
    }

    let delta_total = current.total() - prev.total();
    if delta_total <= 0.0 {
        return 0.0;
    }
    // iowait is not monotonic on Linux
    let delta_iowait = (current.iowait - prev.iowait.max(0.0)).clamp(0.0, delta_total);

    100.0 * (delta_iowait / delta_total)
}

/// Disk utilization percentage: `Δbusy_ms / Δwall_ms * 100`, capped at 100.
///
/// The raw ratio can exceed 1 on devices with several hardware queues.
pub fn disk_utilization(prev: &DiskCounters, current: &DiskCounters) -> f64 {
    let Some(delta_wall_ms) = elapsed_ms(prev.captured_at, current.captured_at) else {
        return 0.0;
    };
    if delta_wall_ms <= 0 {
        return 0.0;
    }

    let delta_busy_ms = current.busy_time_ms.saturating_sub(prev.busy_time_ms) as f64;
    let utilization = delta_busy_ms / delta_wall_ms as f64 * 100.0;

    utilization.min(MAX_UTILIZATION)
}

/// Average wait per I/O in milliseconds: `Δ(read_ms + write_ms) / Δ(reads + writes)`.
pub fn disk_await(prev: &DiskCounters, current: &DiskCounters) -> f64 {
    if prev.captured_at.is_none() {
        return 0.0;
    }

    let total_ops = completed_ops(prev, current);
    if total_ops == 0 {
        return 0.0;
    }

    let total_time_ms = current.read_time_ms.saturating_sub(prev.read_time_ms)
        + current.write_time_ms.saturating_sub(prev.write_time_ms);

    total_time_ms as f64 / total_ops as f64
}

/// I/O operations per second: `Δ(reads + writes) / Δwall_seconds`.
pub fn disk_iops(prev: &DiskCounters, current: &DiskCounters) -> f64 {
    let Some(delta_seconds) = elapsed_seconds(prev.captured_at, current.captured_at) else {
        return 0.0;
    };
    if delta_seconds <= 0.0 {
        return 0.0;
    }

    completed_ops(prev, current) as f64 / delta_seconds
}

/// Bandwidth in bits per second: `Δ(sent + received) * 8 / Δwall_seconds`.
pub fn network_bandwidth(prev: &NetCounters, current: &NetCounters) -> f64 {
    let Some(delta_seconds) = elapsed_seconds(prev.captured_at, current.captured_at) else {
        return 0.0;
    };
    if delta_seconds <= 0.0 {
        return 0.0;
    }

    let total_bytes = current.bytes_sent.saturating_sub(prev.bytes_sent)
        + current.bytes_recv.saturating_sub(prev.bytes_recv);

    (total_bytes as f64 * 8.0) / delta_seconds
}

fn completed_ops(prev: &DiskCounters, current: &DiskCounters) -> u64 {
    current.read_count.saturating_sub(prev.read_count)
        + current.write_count.saturating_sub(prev.write_count)
}
