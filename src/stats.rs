//! Per-endpoint counters.

use std::time::Duration;

/// What one endpoint's worker did with its jobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointStats {
    pub jobs: u64,
    /// Lookups that came back with no addresses.
    pub empty: u64,
    /// Lookups that came back with exactly the endpoint's sinkhole.
    pub matched_baseline: u64,
    pub forwarded: u64,
    pub failed: u64,
    /// Cumulative lookup time, for averaging.
    total_lookup_time: Duration,
}

impl EndpointStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_empty(&mut self, elapsed: Duration) {
        self.record(elapsed);
        self.empty += 1;
    }

    pub fn record_matched_baseline(&mut self, elapsed: Duration) {
        self.record(elapsed);
        self.matched_baseline += 1;
    }

    pub fn record_forwarded(&mut self, elapsed: Duration) {
        self.record(elapsed);
        self.forwarded += 1;
    }

    pub fn record_failed(&mut self, elapsed: Duration) {
        self.record(elapsed);
        self.failed += 1;
    }

    fn record(&mut self, elapsed: Duration) {
        self.jobs += 1;
        self.total_lookup_time += elapsed;
    }

    pub fn suppressed(&self) -> u64 {
        self.empty + self.matched_baseline
    }

    pub fn avg_lookup_ms(&self) -> f64 {
        if self.jobs > 0 {
            self.total_lookup_time.as_secs_f64() * 1000.0 / self.jobs as f64
        } else {
            0.0
        }
    }
}
