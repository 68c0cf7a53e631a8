//! Disk I/O sampler.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DeviceFilter, Sampler};
use crate::metrics::{disk_await, disk_iops, disk_utilization, DiskCounters, DiskStats};
use crate::platform::Capabilities;
use crate::source::{CounterSource, SourceError};

pub struct DiskSampler {
    source: Arc<dyn CounterSource>,
    capabilities: Capabilities,
    filter: DeviceFilter,
    prev: BTreeMap<String, DiskCounters>,
    primed: bool,
}

impl DiskSampler {
    pub fn new(
        source: Arc<dyn CounterSource>,
        capabilities: Capabilities,
        filter: DeviceFilter,
    ) -> Self {
        Self {
            source,
            capabilities,
            filter,
            prev: BTreeMap::new(),
            primed: false,
        }
    }
}

impl Sampler for DiskSampler {
    /// `None` on the baseline call. Devices seen for the first time after the
    /// baseline are stored and reported from the following call on.
    type Output = Option<BTreeMap<String, DiskStats>>;

    fn name(&self) -> &'static str {
        "disk"
    }

    fn collect_at(&mut self, now: DateTime<Utc>) -> Result<Self::Output, SourceError> {
        let raw = self.source.disk_counters()?;

        let mut current = BTreeMap::new();
        let mut stats = BTreeMap::new();

        for (device, mut counters) in raw {
            if !self.filter.allows(&device) {
                continue;
            }

            counters.busy_time_ms = self.capabilities.resolve_busy_time(
                counters.busy_time_ms,
                counters.read_time_ms,
                counters.write_time_ms,
            );
            counters.captured_at = Some(now);

            if let Some(prev) = self.prev.get(&device) {
                stats.insert(
                    device.clone(),
                    DiskStats {
                        utilization: disk_utilization(prev, &counters),
                        await_ms: disk_await(prev, &counters),
                        iops: disk_iops(prev, &counters),
                    },
                );
            }
            current.insert(device, counters);
        }

        self.prev = current;
        if !self.primed {
            self.primed = true;
            return Ok(None);
        }

        Ok(Some(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::FakeSource;
    use chrono::{Duration, TimeZone};

    fn counters(ops: u64, time_ms: u64, busy_ms: u64) -> DiskCounters {
        DiskCounters {
            read_count: ops,
            write_count: ops,
            read_time_ms: time_ms,
            write_time_ms: time_ms,
            busy_time_ms: busy_ms,
            captured_at: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_baseline_then_stats() {
        let source = Arc::new(FakeSource::default());
        source.set_disk("sda", counters(100, 1000, 1000));
        let mut sampler = DiskSampler::new(
            source.clone(),
            Capabilities::for_os("linux"),
            DeviceFilter::allow_all(),
        );

        assert_eq!(sampler.collect_at(t0()).unwrap(), None);

        source.set_disk("sda", counters(150, 1250, 1500));
        let stats = sampler
            .collect_at(t0() + Duration::seconds(1))
            .unwrap()
            .unwrap();
        let sda = stats["sda"];
        assert!((sda.utilization - 50.0).abs() < 1e-9);
        assert!((sda.iops - 100.0).abs() < 1e-9);
        assert!((sda.await_ms - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_device_reported_from_next_tick() {
        let source = Arc::new(FakeSource::default());
        source.set_disk("sda", counters(0, 0, 0));
        let mut sampler = DiskSampler::new(
            source.clone(),
            Capabilities::for_os("linux"),
            DeviceFilter::allow_all(),
        );
        sampler.collect_at(t0()).unwrap();

        source.set_disk("sdb", counters(0, 0, 0));
        let stats = sampler
            .collect_at(t0() + Duration::seconds(1))
            .unwrap()
            .unwrap();
        assert!(stats.contains_key("sda"));
        assert!(!stats.contains_key("sdb"));

        let stats = sampler
            .collect_at(t0() + Duration::seconds(2))
            .unwrap()
            .unwrap();
        assert!(stats.contains_key("sdb"));
    }

    #[test]
    fn test_filtered_devices_skipped() {
        let source = Arc::new(FakeSource::default());
        source.set_disk("sda", counters(0, 0, 0));
        source.set_disk("sdb", counters(0, 0, 0));
        let mut sampler = DiskSampler::new(
            source.clone(),
            Capabilities::for_os("linux"),
            DeviceFilter::new(Vec::<&str>::new(), ["/dev/sdb"]),
        );
        sampler.collect_at(t0()).unwrap();

        let stats = sampler
            .collect_at(t0() + Duration::seconds(1))
            .unwrap()
            .unwrap();
        assert_eq!(stats.keys().collect::<Vec<_>>(), vec!["sda"]);
    }

    #[test]
    fn test_busy_time_fallback() {
        let source = Arc::new(FakeSource::default());
        source.set_disk("PhysicalDrive0", counters(0, 0, 0));
        let mut sampler = DiskSampler::new(
            source.clone(),
            Capabilities::for_os("windows"),
            DeviceFilter::allow_all(),
        );
        sampler.collect_at(t0()).unwrap();

        // read + write time = 200ms of 1000ms wall
        source.set_disk("PhysicalDrive0", counters(10, 100, 0));
        let stats = sampler
            .collect_at(t0() + Duration::seconds(1))
            .unwrap()
            .unwrap();
        assert!((stats["PhysicalDrive0"].utilization - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_error_propagates() {
        let source = Arc::new(FakeSource::default());
        *source.fail_disks.lock().unwrap() = true;
        let mut sampler = DiskSampler::new(
            source,
            Capabilities::for_os("linux"),
            DeviceFilter::allow_all(),
        );
        assert!(sampler.collect_at(t0()).is_err());
    }
}
