//! Counter source backed by the Linux /proc filesystem.
//!
//! Reads `/proc/stat`, `/proc/meminfo`, `/proc/diskstats` and `/proc/net/dev`.
//! The parsers are plain functions over file contents so they can be tested
//! against fixtures.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{CounterSource, MemoryInfo, SourceError};
use crate::metrics::{CpuTimes, DiskCounters, NetCounters};

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// System clock ticks per second (for CPU time conversion).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Reads counters from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsSource {
    /// Source reading from `/proc`.
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Source reading from an alternative procfs root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, relative: &str) -> Result<String, SourceError> {
        let path = self.root.join(relative);
        fs::read_to_string(&path).map_err(|source| SourceError::Io { path, source })
    }
}

impl CounterSource for ProcfsSource {
    fn cpu_times(&self) -> Result<CpuTimes, SourceError> {
        parse_cpu_stat(&self.read("stat")?, *CLK_TCK)
    }

    fn memory(&self) -> Result<MemoryInfo, SourceError> {
        parse_meminfo(&self.read("meminfo")?)
    }

    fn disk_counters(&self) -> Result<BTreeMap<String, DiskCounters>, SourceError> {
        Ok(parse_diskstats(&self.read("diskstats")?))
    }

    fn net_counters(&self) -> Result<BTreeMap<String, NetCounters>, SourceError> {
        Ok(parse_netdev(&self.read("net/dev")?))
    }
}

/// Parses the aggregate `cpu` line of /proc/stat into seconds.
///
/// Format: `cpu user nice system idle iowait irq softirq steal guest guest_nice`.
/// `nice` is folded into `user`; guest time is already part of `user`.
pub fn parse_cpu_stat(content: &str, clk_tck: f64) -> Result<CpuTimes, SourceError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or(SourceError::Empty("CPU"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>().unwrap_or(0))
        .collect();
    if fields.len() < 7 {
        return Err(SourceError::Parse {
            what: "/proc/stat",
            detail: format!("expected at least 7 cpu fields, got {}", fields.len()),
        });
    }

    let secs = |ticks: u64| ticks as f64 / clk_tck;
    let field = |idx: usize| fields.get(idx).copied().unwrap_or(0);

    Ok(CpuTimes {
        user: secs(field(0) + field(1)),
        system: secs(field(2)),
        idle: secs(field(3)),
        iowait: secs(field(4)),
        irq: secs(field(5)),
        softirq: secs(field(6)),
        steal: secs(field(7)),
        captured_at: None,
    })
}

/// Parses MemTotal and MemAvailable from /proc/meminfo.
///
/// Kernels without MemAvailable fall back to MemFree + Buffers + Cached.
pub fn parse_meminfo(content: &str) -> Result<MemoryInfo, SourceError> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;
    let mut free_kb = 0u64;
    let mut buffers_kb = 0u64;
    let mut cached_kb = 0u64;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total_kb = Some(kb),
            "MemAvailable:" => available_kb = Some(kb),
            "MemFree:" => free_kb = kb,
            "Buffers:" => buffers_kb = kb,
            "Cached:" => cached_kb = kb,
            _ => {}
        }
    }

    let total_kb = total_kb.ok_or_else(|| SourceError::Parse {
        what: "/proc/meminfo",
        detail: "MemTotal not found".to_string(),
    })?;
    let available_kb = available_kb.unwrap_or(free_kb + buffers_kb + cached_kb);

    Ok(MemoryInfo {
        total_bytes: total_kb * 1024,
        available_bytes: available_kb * 1024,
    })
}

/// Parses /proc/diskstats.
///
/// Format: `major minor name reads reads_merged sectors_read read_ms writes
/// writes_merged sectors_written write_ms in_flight io_ms weighted_io_ms ...`.
/// Loop and ram devices are skipped.
pub fn parse_diskstats(content: &str) -> BTreeMap<String, DiskCounters> {
    let mut stats = BTreeMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue; // Skip malformed lines
        }

        let device = parts[2];
        if device.starts_with("loop") || device.starts_with("ram") {
            continue;
        }

        let num = |idx: usize| parts[idx].parse::<u64>().unwrap_or(0);
        stats.insert(
            device.to_string(),
            DiskCounters {
                read_count: num(3),
                read_time_ms: num(6),
                write_count: num(7),
                write_time_ms: num(10),
                busy_time_ms: num(12),
                captured_at: None,
            },
        );
    }

    stats
}

/// Parses /proc/net/dev receive and transmit byte counters.
pub fn parse_netdev(content: &str) -> BTreeMap<String, NetCounters> {
    let mut stats = BTreeMap::new();

    // The first two lines are headers
    for line in content.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            continue; // Skip malformed lines
        }

        stats.insert(
            name.trim().to_string(),
            NetCounters {
                bytes_recv: values[0].parse().unwrap_or(0),
                bytes_sent: values[8].parse().unwrap_or(0),
                captured_at: None,
            },
        );
    }

    stats
}
