//! Memory utilization sampler.
//!
//! Memory usage is a gauge, not a counter, so there is no baseline state.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::Sampler;
use crate::source::{CounterSource, SourceError};

pub struct MemorySampler {
    source: Arc<dyn CounterSource>,
}

impl MemorySampler {
    pub fn new(source: Arc<dyn CounterSource>) -> Self {
        Self { source }
    }
}

impl Sampler for MemorySampler {
    /// Used memory percentage.
    type Output = f64;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn collect_at(&mut self, _now: DateTime<Utc>) -> Result<f64, SourceError> {
        self.source.memory()?.utilization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::FakeSource;
    use crate::source::MemoryInfo;

    #[test]
    fn test_memory_utilization() {
        let source = Arc::new(FakeSource::default());
        *source.memory.lock().unwrap() = MemoryInfo {
            total_bytes: 8 * 1024,
            available_bytes: 2 * 1024,
        };

        let mut sampler = MemorySampler::new(source);
        assert!((sampler.collect().unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_is_error() {
        let mut sampler = MemorySampler::new(Arc::new(FakeSource::default()));
        assert!(sampler.collect().is_err());
    }
}
