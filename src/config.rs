//! Process-wide defaults and startup configuration.

use std::time::Duration;

/// Job workers started when no count is given.
pub const DEFAULT_WORKER_COUNT: usize = 2;
/// Interval between two raw-material generation ticks.
pub const GENERATION_INTERVAL_MS: u64 = 300;
/// Retries allowed per step after its first attempt.
pub const MAX_STEP_RETRIES: u32 = 3;
/// Pause before re-attempting a step that asked for a retry.
pub const RETRY_BACKOFF_MS: u64 = 1000;
/// Time a transporter spends carrying one unit.
pub const TRANSIT_DELAY_MS: u64 = 200;
/// Time a cutter spends on one pipe.
pub const CUT_DURATION_MS: u64 = 3000;

/// Bounded retry-with-backoff applied to each step of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Upper bound on attempts for one step.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_STEP_RETRIES,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }
}

/// Startup parameters for an orchestrator; fixed for its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactoryConfig {
    pub worker_count: usize,
    pub generation_interval: Duration,
    pub retry: RetryPolicy,
    pub transit_delay: Duration,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            generation_interval: Duration::from_millis(GENERATION_INTERVAL_MS),
            retry: RetryPolicy::default(),
            transit_delay: Duration::from_millis(TRANSIT_DELAY_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = FactoryConfig::default();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.generation_interval, Duration::from_millis(300));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.max_attempts(), 4);
        assert_eq!(config.retry.backoff, Duration::from_secs(1));
    }
}
