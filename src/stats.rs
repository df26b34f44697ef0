//! Lock-free counters describing what the orchestrator has done so far.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct FactoryStats {
    jobs_enqueued: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_aborted: AtomicU64,
    steps_succeeded: AtomicU64,
    step_retries: AtomicU64,
}

/// Point-in-time copy of [`FactoryStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub jobs_enqueued: u64,
    pub jobs_completed: u64,
    pub jobs_aborted: u64,
    pub steps_succeeded: u64,
    pub step_retries: u64,
}

impl StatsSnapshot {
    /// Jobs that reached a terminal outcome either way.
    pub fn jobs_finished(&self) -> u64 {
        self.jobs_completed + self.jobs_aborted
    }
}

impl FactoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_aborted(&self) {
        self.jobs_aborted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_step_success(&self) {
        self.steps_succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_retry(&self) {
        self.step_retries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            jobs_enqueued: self.jobs_enqueued.load(Ordering::SeqCst),
            jobs_completed: self.jobs_completed.load(Ordering::SeqCst),
            jobs_aborted: self.jobs_aborted.load(Ordering::SeqCst),
            steps_succeeded: self.steps_succeeded.load(Ordering::SeqCst),
            step_retries: self.step_retries.load(Ordering::SeqCst),
        }
    }
}
