//! Step and job execution with the bounded retry policy.

use std::thread;

use tracing::{debug, error, info, warn};

use crate::error::{JobError, OrchestratorError};
use crate::job::{Job, Step};
use crate::orchestrator::Shared;
use crate::types::StepStatus;

/// Summary of a job that ran all of its steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    pub job: String,
    pub steps: usize,
    pub retries: u32,
}

impl Shared {
    /// Route a step to its machine and block until that machine reports.
    ///
    /// Routing failures count as `Error`; nothing was enqueued for them.
    pub(crate) fn execute_step(&self, step: &Step) -> StepStatus {
        // The directory lock is released before the blocking wait.
        let routed = match self.directory.read() {
            Ok(directory) => directory.route(step),
            Err(_) => {
                error!(target_machine = %step.target(), "machine directory poisoned");
                return StepStatus::Error;
            }
        };
        match routed {
            Ok(handle) => handle.wait(),
            Err(err) => {
                error!(target_machine = %step.target(), error = %err, "step could not be routed");
                StepStatus::Error
            }
        }
    }

    /// Run every step in order, retrying transient failures with backoff.
    pub(crate) fn execute_job(&self, mut job: Job) -> Result<JobReport, JobError> {
        let policy = self.retry;
        let mut step_number = 1usize;
        let mut total_retries = 0u32;

        while let Some(step) = job.next_step() {
            let mut retries = 0u32;
            loop {
                debug!(
                    job = job.name(),
                    step = step_number,
                    attempt = retries + 1,
                    "executing step"
                );
                match self.execute_step(step) {
                    StepStatus::Success => break,
                    StepStatus::Retry if retries < policy.max_retries => {
                        retries += 1;
                        self.stats.record_retry();
                        warn!(
                            job = job.name(),
                            step = step_number,
                            retry = retries,
                            "step not ready, backing off"
                        );
                        thread::sleep(policy.backoff);
                    }
                    StepStatus::Retry => {
                        self.stats.record_aborted();
                        return Err(JobError::RetriesExhausted {
                            job: job.name().to_string(),
                            step: step_number,
                            attempts: retries + 1,
                        });
                    }
                    StepStatus::Error => {
                        self.stats.record_aborted();
                        return Err(JobError::StepFailed {
                            job: job.name().to_string(),
                            step: step_number,
                        });
                    }
                }
            }

            self.stats.record_step_success();
            debug!(job = job.name(), step = step_number, "step completed");
            total_retries += retries;
            job.pop_step();
            step_number += 1;
        }

        self.stats.record_completed();
        info!(job = job.name(), steps = step_number - 1, "job finished");
        Ok(JobReport {
            job: job.name().to_string(),
            steps: step_number - 1,
            retries: total_retries,
        })
    }

    pub(crate) fn enqueue_job(&self, job: Job) -> Result<(), OrchestratorError> {
        let name = job.name().to_string();
        self.jobs.push(job).map_err(|_| OrchestratorError::QueueClosed)?;
        self.stats.record_enqueued();
        debug!(job = %name, "job enqueued");
        Ok(())
    }
}
