//! Fixed-size pool of job workers draining the shared job queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::error::OrchestratorError;
use crate::orchestrator::Shared;

/// Spawn `count` workers. Either all of them start or none are left running.
pub(crate) fn spawn_workers(
    shared: &Arc<Shared>,
    count: usize,
) -> Result<Vec<JoinHandle<()>>, OrchestratorError> {
    let mut handles = Vec::with_capacity(count);
    for worker_id in 0..count {
        let worker_shared = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(format!("job-worker-{worker_id}"))
            .spawn(move || worker_loop(worker_id, worker_shared));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                shared.jobs.close();
                join_workers(handles);
                return Err(OrchestratorError::ThreadSpawn {
                    thread: format!("job-worker-{worker_id}"),
                    source,
                });
            }
        }
    }
    Ok(handles)
}

pub(crate) fn join_workers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            error!("job worker panicked");
        }
    }
}

fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    debug!(worker = worker_id, "job worker started");
    while let Some(job) = shared.jobs.pop_blocking_or_closed() {
        // An aborted job is reported and dropped; the worker keeps going.
        match shared.execute_job(job) {
            Ok(report) => info!(
                worker = worker_id,
                job = %report.job,
                steps = report.steps,
                retries = report.retries,
                "job completed"
            ),
            Err(err) => error!(
                worker = worker_id,
                job = err.job(),
                step = err.step(),
                error = %err,
                "job aborted"
            ),
        }
    }
    debug!(worker = worker_id, "job worker exiting");
}
