//! CPU utilization and iowait sampler.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::Sampler;
use crate::metrics::{cpu_iowait, cpu_utilization, CpuTimes};
use crate::platform::Capabilities;
use crate::source::{CounterSource, SourceError};

/// CPU percentages for one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuReading {
    pub utilization: f64,
    /// Negative when the platform cannot report iowait.
    pub iowait: f64,
}

pub struct CpuSampler {
    source: Arc<dyn CounterSource>,
    capabilities: Capabilities,
    prev: CpuTimes,
}

impl CpuSampler {
    pub fn new(source: Arc<dyn CounterSource>, capabilities: Capabilities) -> Self {
        Self {
            source,
            capabilities,
            prev: CpuTimes::default(),
        }
    }
}

impl Sampler for CpuSampler {
    /// `None` on the baseline call.
    type Output = Option<CpuReading>;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn collect_at(&mut self, now: DateTime<Utc>) -> Result<Self::Output, SourceError> {
        let mut current = self.source.cpu_times()?;
        current.iowait = self.capabilities.resolve_iowait(current.iowait);
        current.captured_at = Some(now);

        let prev = std::mem::replace(&mut self.prev, current);
        if prev.captured_at.is_none() {
            return Ok(None);
        }

        Ok(Some(CpuReading {
            utilization: cpu_utilization(&prev, &current),
            iowait: cpu_iowait(&prev, &current),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::FakeSource;
    use crate::metrics::CPU_WAIT_UNAVAILABLE;
    use chrono::{Duration, TimeZone};

    fn times(user: f64, system: f64, idle: f64, iowait: f64) -> CpuTimes {
        CpuTimes {
            user,
            system,
            idle,
            iowait,
            ..Default::default()
        }
    }

    #[test]
    fn test_baseline_then_delta() {
        let source = Arc::new(FakeSource::default());
        let mut sampler = CpuSampler::new(source.clone(), Capabilities::for_os("linux"));
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        source.set_cpu(times(100.0, 50.0, 800.0, 10.0));
        assert_eq!(sampler.collect_at(t0).unwrap(), None);

        source.set_cpu(times(110.0, 60.0, 810.0, 20.0));
        let reading = sampler
            .collect_at(t0 + Duration::seconds(30))
            .unwrap()
            .unwrap();
        assert!((reading.utilization - 75.0).abs() < 1e-9);
        assert!((reading.iowait - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_iowait_unavailable_platform() {
        let source = Arc::new(FakeSource::default());
        let mut sampler = CpuSampler::new(source.clone(), Capabilities::for_os("windows"));
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        source.set_cpu(times(100.0, 50.0, 800.0, 10.0));
        sampler.collect_at(t0).unwrap();
        source.set_cpu(times(110.0, 60.0, 810.0, 20.0));
        let reading = sampler
            .collect_at(t0 + Duration::seconds(1))
            .unwrap()
            .unwrap();

        assert_eq!(reading.iowait, CPU_WAIT_UNAVAILABLE);
    }
}
