//! Collection manager: baseline pass, startup delay, then a fixed-interval
//! tick loop publishing one `Snapshot` per tick onto a bounded queue.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{CpuSampler, DeviceFilter, DiskSampler, MemorySampler, NetworkSampler, Sampler};
use crate::metrics::Snapshot;
use crate::platform::Capabilities;
use crate::source::CounterSource;
use crate::stats::PipelineStats;

/// Slots in the queue between the manager and the export sink.
pub const QUEUE_CAPACITY: usize = 10;

/// Pause between the baseline pass and the first tick.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Collection settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub interval: Duration,
    pub startup_delay: Duration,
    pub disk_filter: DeviceFilter,
    pub network_filter: DeviceFilter,
    pub capabilities: Capabilities,
}

impl CollectorSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            startup_delay: DEFAULT_STARTUP_DELAY,
            disk_filter: DeviceFilter::allow_all(),
            network_filter: DeviceFilter::allow_all(),
            capabilities: Capabilities::current(),
        }
    }
}

/// The four resource samplers, run together once per tick.
pub struct SamplerSet {
    cpu: CpuSampler,
    memory: MemorySampler,
    disk: DiskSampler,
    network: NetworkSampler,
}

/// Accumulator shared by the per-resource tasks of one tick.
struct TickState {
    snapshot: Snapshot,
    disk_baseline: bool,
    network_baseline: bool,
}

impl SamplerSet {
    pub fn new(source: Arc<dyn CounterSource>, settings: &CollectorSettings) -> Self {
        Self {
            cpu: CpuSampler::new(Arc::clone(&source), settings.capabilities),
            memory: MemorySampler::new(Arc::clone(&source)),
            disk: DiskSampler::new(
                Arc::clone(&source),
                settings.capabilities,
                settings.disk_filter.clone(),
            ),
            network: NetworkSampler::new(source, settings.network_filter.clone()),
        }
    }

    /// Runs every sampler once to seed previous counters. Results are
    /// discarded; returns how many samplers failed to read their source.
    pub fn baseline(&mut self, now: DateTime<Utc>) -> usize {
        let mut failures = 0;
        if let Err(e) = self.cpu.collect_at(now) {
            warn!("Baseline {} collection failed: {}", self.cpu.name(), e);
            failures += 1;
        }
        if let Err(e) = self.memory.collect_at(now) {
            warn!("Baseline {} collection failed: {}", self.memory.name(), e);
            failures += 1;
        }
        if let Err(e) = self.disk.collect_at(now) {
            warn!("Baseline {} collection failed: {}", self.disk.name(), e);
            failures += 1;
        }
        if let Err(e) = self.network.collect_at(now) {
            warn!("Baseline {} collection failed: {}", self.network.name(), e);
            failures += 1;
        }
        failures
    }

    /// Runs all samplers concurrently and merges their results.
    ///
    /// Returns `None` when the disk or network sampler was still on its
    /// baseline call, in which case nothing should be published. A resource
    /// whose source failed is left out of the snapshot.
    pub fn tick(&mut self, now: DateTime<Utc>, stats: &PipelineStats) -> Option<Snapshot> {
        let state = Mutex::new(TickState {
            snapshot: Snapshot::new(now),
            disk_baseline: false,
            network_baseline: false,
        });

        let Self {
            cpu,
            memory,
            disk,
            network,
        } = self;
        let state_ref = &state;

        rayon::scope(|s| {
            s.spawn(move |_| match cpu.collect_at(now) {
                Ok(Some(reading)) => {
                    if let Ok(mut st) = state_ref.lock() {
                        st.snapshot.cpu = reading.utilization;
                        st.snapshot.cpu_wait = reading.iowait;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to collect {} metrics: {}", cpu.name(), e);
                    stats.record_sampler_failure();
                }
            });

            s.spawn(move |_| match memory.collect_at(now) {
                Ok(utilization) => {
                    if let Ok(mut st) = state_ref.lock() {
                        st.snapshot.memory = utilization;
                    }
                }
                Err(e) => {
                    warn!("Failed to collect {} metrics: {}", memory.name(), e);
                    stats.record_sampler_failure();
                }
            });

            s.spawn(move |_| {
                let result = disk.collect_at(now);
                if let Ok(mut st) = state_ref.lock() {
                    match result {
                        Ok(Some(disks)) => st.snapshot.disks = disks,
                        Ok(None) => st.disk_baseline = true,
                        Err(e) => {
                            warn!("Failed to collect {} metrics: {}", disk.name(), e);
                            stats.record_sampler_failure();
                        }
                    }
                }
            });

            s.spawn(move |_| {
                let result = network.collect_at(now);
                if let Ok(mut st) = state_ref.lock() {
                    match result {
                        Ok(Some(nets)) => st.snapshot.networks = nets,
                        Ok(None) => st.network_baseline = true,
                        Err(e) => {
                            warn!("Failed to collect {} metrics: {}", network.name(), e);
                            stats.record_sampler_failure();
                        }
                    }
                }
            });
        });

        let state = state.into_inner().ok()?;
        if state.disk_baseline || state.network_baseline {
            debug!("Disk or network sampler still on baseline, skipping publish");
            return None;
        }

        Some(state.snapshot)
    }
}

/// Drives the samplers on a fixed interval and publishes snapshots.
pub struct CollectorManager {
    samplers: SamplerSet,
    interval: Duration,
    startup_delay: Duration,
    tx: mpsc::Sender<Snapshot>,
    stats: Arc<PipelineStats>,
}

impl CollectorManager {
    pub fn new(
        settings: CollectorSettings,
        source: Arc<dyn CounterSource>,
        tx: mpsc::Sender<Snapshot>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            samplers: SamplerSet::new(source, &settings),
            interval: settings.interval,
            startup_delay: settings.startup_delay,
            tx,
            stats,
        }
    }

    /// Runs until `cancel` fires or the queue's receiver goes away.
    ///
    /// The sender is dropped when this returns, which closes the queue and
    /// lets the sink drain whatever is still in flight.
    #[instrument(skip_all, name = "collector")]
    pub async fn run(self, cancel: CancellationToken) {
        let Self {
            samplers,
            interval,
            startup_delay,
            tx,
            stats,
        } = self;

        let mut samplers = match tokio::task::spawn_blocking(move || {
            let mut samplers = samplers;
            samplers.baseline(Utc::now());
            samplers
        })
        .await
        {
            Ok(samplers) => samplers,
            Err(e) => {
                error!("Baseline collection task failed: {}", e);
                return;
            }
        };
        info!("Baseline collection complete");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Collection cancelled during startup delay");
                return;
            }
            _ = tokio::time::sleep(startup_delay) => {}
        }

        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Collecting metrics every {:?}", interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            let tick_stats = Arc::clone(&stats);
            let outcome = tokio::task::spawn_blocking(move || {
                let snapshot = samplers.tick(Utc::now(), &tick_stats);
                (samplers, snapshot)
            })
            .await;

            let snapshot = match outcome {
                Ok((returned, snapshot)) => {
                    samplers = returned;
                    snapshot
                }
                Err(e) => {
                    error!("Collection tick task failed: {}", e);
                    break;
                }
            };
            stats.record_tick(started.elapsed());

            let Some(snapshot) = snapshot else {
                continue;
            };

            if !try_publish(&tx, snapshot, &stats) {
                warn!("Export queue closed, stopping collection");
                break;
            }
        }

        info!("Collection manager stopped");
    }
}

/// Publishes `snapshot` without blocking, counting it as dropped when the
/// queue is full. Returns false once the queue is closed.
pub fn try_publish(
    tx: &mpsc::Sender<Snapshot>,
    snapshot: Snapshot,
    stats: &PipelineStats,
) -> bool {
    match tx.try_send(snapshot) {
        Ok(()) => {
            stats.record_published();
            true
        }
        Err(TrySendError::Full(dropped)) => {
            stats.record_dropped();
            warn!(
                "Export queue full, dropping snapshot from {}",
                dropped.timestamp
            );
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
