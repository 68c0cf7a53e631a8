//! Platform capability lookup.
//!
//! Counter availability differs between operating systems: some never report
//! CPU iowait, some report it as a meaningless zero, and some do not expose a
//! disk busy-time counter at all. The policy for each platform lives in one
//! table, resolved once at startup and handed to the samplers.

use tracing::{info, warn};

/// How a platform reports CPU iowait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoWaitSupport {
    /// Reported and accurate.
    Native,
    /// Reported, but a zero value means "not measured".
    ZeroMeansUnavailable,
    /// Never reported.
    Unavailable,
}

/// Counter capabilities of the platform the agent runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub os: &'static str,
    pub iowait: IoWaitSupport,
    /// Approximate busy time as `read_time + write_time` when the OS reports 0.
    pub disk_busy_fallback: bool,
}

impl Capabilities {
    /// Capabilities for the platform this binary was built for.
    pub fn current() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    /// Capabilities for a platform identifier as returned by `std::env::consts::OS`.
    pub fn for_os(os: &'static str) -> Self {
        let (iowait, disk_busy_fallback) = match os {
            "linux" => (IoWaitSupport::Native, false),
            "macos" => (IoWaitSupport::ZeroMeansUnavailable, false),
            "windows" => (IoWaitSupport::Unavailable, true),
            _ => (IoWaitSupport::Unavailable, false),
        };

        Self {
            os,
            iowait,
            disk_busy_fallback,
        }
    }

    /// Applies the iowait policy to a raw reading, returning a negative value
    /// when the platform cannot provide it.
    pub fn resolve_iowait(&self, raw: f64) -> f64 {
        match self.iowait {
            IoWaitSupport::Native => raw,
            IoWaitSupport::ZeroMeansUnavailable if raw == 0.0 => -1.0,
            IoWaitSupport::ZeroMeansUnavailable => raw,
            IoWaitSupport::Unavailable => -1.0,
        }
    }

    /// Applies the busy-time fallback to a raw disk reading.
    pub fn resolve_busy_time(&self, busy_ms: u64, read_ms: u64, write_ms: u64) -> u64 {
        if self.disk_busy_fallback && busy_ms == 0 {
            read_ms + write_ms
        } else {
            busy_ms
        }
    }

    /// Logs what the operator should expect from this platform.
    pub fn log_summary(&self) {
        match (self.os, self.iowait) {
            ("linux", _) => info!("Running on Linux: all metrics available"),
            ("macos", _) => {
                info!("Running on macOS: CPU iowait may have limited accuracy");
                info!("Running on macOS: disk metrics may require elevated permissions");
            }
            (_, IoWaitSupport::Unavailable) => {
                warn!("Running on {}: CPU iowait metric is not available", self.os)
            }
            _ => warn!(
                "Running on unsupported platform {}, some metrics may not work",
                self.os
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_reports_iowait() {
        let caps = Capabilities::for_os("linux");
        assert_eq!(caps.resolve_iowait(0.0), 0.0);
        assert_eq!(caps.resolve_iowait(12.5), 12.5);
        assert_eq!(caps.resolve_busy_time(0, 10, 20), 0);
    }

    #[test]
    fn test_macos_zero_iowait_is_unavailable() {
        let caps = Capabilities::for_os("macos");
        assert_eq!(caps.resolve_iowait(0.0), -1.0);
        assert_eq!(caps.resolve_iowait(3.0), 3.0);
    }

    #[test]
    fn test_windows_busy_time_fallback() {
        let caps = Capabilities::for_os("windows");
        assert_eq!(caps.resolve_iowait(7.0), -1.0);
        assert_eq!(caps.resolve_busy_time(0, 10, 20), 30);
        assert_eq!(caps.resolve_busy_time(5, 10, 20), 5);
    }

    #[test]
    fn test_unknown_platform() {
        let caps = Capabilities::for_os("plan9");
        assert_eq!(caps.iowait, IoWaitSupport::Unavailable);
        assert!(!caps.disk_busy_fallback);
    }
}
