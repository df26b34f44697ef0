//! Pending jobs shared between the orchestrator and its worker pool.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::job::Job;

/// Jobs in submission order. Each job goes to exactly one worker.
///
/// A closed queue refuses new jobs and releases blocked workers, but keeps
/// its backlog so a restarted pool picks up where the old one stopped.
pub struct JobQueue {
    state: Mutex<Backlog>,
    wakeup: Condvar,
}

#[derive(Default)]
struct Backlog {
    jobs: VecDeque<Job>,
    closed: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Backlog::default()),
            wakeup: Condvar::new(),
        }
    }

    /// Append a job. A closed queue hands the job back untouched.
    pub fn push(&self, job: Job) -> Result<(), Job> {
        let mut backlog = self.lock();
        if backlog.closed {
            return Err(job);
        }
        backlog.jobs.push_back(job);
        drop(backlog);
        self.wakeup.notify_one();
        Ok(())
    }

    pub fn try_pop(&self) -> Option<Job> {
        self.lock().jobs.pop_front()
    }

    /// Next job for a worker, or `None` once the queue is closed.
    ///
    /// Closing takes priority over the backlog.
    pub fn pop_blocking_or_closed(&self) -> Option<Job> {
        let backlog = self.lock();
        let mut backlog = self
            .wakeup
            .wait_while(backlog, |backlog| !backlog.closed && backlog.jobs.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        if backlog.closed {
            return None;
        }
        backlog.jobs.pop_front()
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.wakeup.notify_all();
    }

    pub fn reopen(&self) {
        self.lock().closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    // Nothing panics while holding the lock, so a poisoned backlog is intact.
    fn lock(&self) -> MutexGuard<'_, Backlog> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
