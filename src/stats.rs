//! Pipeline statistics shared by the collection manager and the export sink.
//!
//! Counters are plain atomics so both sides can update them without locking;
//! tick durations are tracked as a running min/avg/max.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

/// Point-in-time view of a `Stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatSummary {
    pub last: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn summary(&self) -> StatSummary {
        match self.inner.lock() {
            Ok(s) => StatSummary {
                last: s.last,
                avg: s.avg(),
                min: s.min,
                max: s.max,
                count: s.count,
            },
            Err(_) => StatSummary::default(),
        }
    }
}

/// Counters for one run of the collection pipeline.
pub struct PipelineStats {
    pub ticks: AtomicU64,
    pub published: AtomicU64,
    pub dropped: AtomicU64,
    pub sampler_failures: AtomicU64,
    pub rows_written: AtomicU64,
    pub flushes: AtomicU64,
    pub rotations: AtomicU64,
    pub write_failures: AtomicU64,
    pub tick_duration_ms: Stat,
    pub start_time: Instant,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            sampler_failures: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            tick_duration_ms: Stat::default(),
            start_time: Instant::now(),
        }
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_tick(&self, duration: Duration) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.tick_duration_ms
            .add_sample(duration.as_secs_f64() * 1000.0);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sampler_failure(&self) {
        self.sampler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_row_written(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn rows_written_count(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// One-line human-readable summary.
    pub fn summary_line(&self) -> String {
        let tick = self.tick_duration_ms.summary();
        format!(
            "uptime={}s ticks={} published={} dropped={} sampler_failures={} rows={} flushes={} rotations={} write_failures={} tick_ms(avg={:.2} min={:.2} max={:.2})",
            self.start_time.elapsed().as_secs(),
            self.ticks.load(Ordering::Relaxed),
            self.published.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
            self.sampler_failures.load(Ordering::Relaxed),
            self.rows_written.load(Ordering::Relaxed),
            self.flushes.load(Ordering::Relaxed),
            self.rotations.load(Ordering::Relaxed),
            self.write_failures.load(Ordering::Relaxed),
            tick.avg,
            tick.min,
            tick.max,
        )
    }
}
