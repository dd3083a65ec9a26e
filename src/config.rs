//! Session configuration.

use std::time::Duration;

use crate::baseline::BaselinePolicy;
use crate::error::ConfigError;

/// Configuration for a probing session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of each endpoint's job queue. A full queue blocks dispatch.
    pub queue_depth: usize,
    /// Nonexistent names queried per endpoint to learn its baseline.
    pub probe_count: usize,
    /// Tries per lookup before the job is reported as failed.
    pub attempts: usize,
    /// Upper bound on a single DNS exchange.
    pub timeout: Duration,
    /// Seed for endpoint selection and probe labels. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub baseline_policy: BaselinePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_depth: 3,
            probe_count: 5,
            attempts: 2,
            timeout: Duration::from_secs(5),
            seed: None,
            baseline_policy: BaselinePolicy::FirstNonEmpty,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidKnob("queue depth"));
        }
        if self.probe_count == 0 {
            return Err(ConfigError::InvalidKnob("probe count"));
        }
        if self.attempts == 0 {
            return Err(ConfigError::InvalidKnob("attempts"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidKnob("timeout"));
        }
        Ok(())
    }
}
