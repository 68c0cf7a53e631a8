//! Network bandwidth sampler.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DeviceFilter, Sampler};
use crate::metrics::{network_bandwidth, NetCounters, NetStats};
use crate::source::{CounterSource, SourceError};

/// Loopback interface names across platforms.
const LOOPBACK_NAMES: &[&str] = &["lo", "lo0", "Loopback"];

/// Returns true for loopback-type interfaces, which are never sampled.
pub fn is_loopback(interface: &str) -> bool {
    LOOPBACK_NAMES.contains(&interface) || interface.starts_with("Loopback ")
}

pub struct NetworkSampler {
    source: Arc<dyn CounterSource>,
    filter: DeviceFilter,
    prev: BTreeMap<String, NetCounters>,
    primed: bool,
}

impl NetworkSampler {
    pub fn new(source: Arc<dyn CounterSource>, filter: DeviceFilter) -> Self {
        Self {
            source,
            filter,
            prev: BTreeMap::new(),
            primed: false,
        }
    }
}

impl Sampler for NetworkSampler {
    /// `None` on the baseline call.
    type Output = Option<BTreeMap<String, NetStats>>;

    fn name(&self) -> &'static str {
        "network"
    }

    fn collect_at(&mut self, now: DateTime<Utc>) -> Result<Self::Output, SourceError> {
        let raw = self.source.net_counters()?;

        let mut current = BTreeMap::new();
        let mut stats = BTreeMap::new();

        for (interface, mut counters) in raw {
            if is_loopback(&interface) || !self.filter.allows(&interface) {
                continue;
            }
            counters.captured_at = Some(now);

            if let Some(prev) = self.prev.get(&interface) {
                stats.insert(
                    interface.clone(),
                    NetStats {
                        bandwidth_bps: network_bandwidth(prev, &counters),
                    },
                );
            }
            current.insert(interface, counters);
        }

        self.prev = current;
        if !self.primed {
            self.primed = true;
            return Ok(None);
        }

        Ok(Some(stats))
    }
}
