//! The orchestrator owns every machine, turns job steps into machine
//! commands, and runs jobs on a fixed worker pool.
//!
//! Background threads, all optional and independently stoppable:
//! - one worker per registered machine,
//! - `worker_count` job workers draining the job queue,
//! - a generation driver feeding the source station,
//! - a job spawner feeding the job queue.

mod driver;
mod execution;
mod pool;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

pub use driver::PeriodicDriver;
pub use execution::JobReport;

use crate::command::Command;
use crate::config::{FactoryConfig, RetryPolicy};
use crate::error::{JobError, OrchestratorError};
use crate::job::{Job, Step};
use crate::job_queue::JobQueue;
use crate::machine::{
    MachineActor, MachineRef, SourceStation, Transform, Transporter, TypedProcessor,
};
use crate::material::{GENERATABLE_KINDS, MaterialKind};
use crate::routing::MachineDirectory;
use crate::stats::{FactoryStats, StatsSnapshot};
use crate::types::{MachineCategory, MachineId, StepStatus};

// Polling interval used while waiting for jobs to finish.
const FINISH_POLL_MS: u64 = 20;

/// State shared with job workers and drivers.
pub(crate) struct Shared {
    directory: RwLock<MachineDirectory>,
    jobs: JobQueue,
    retry: RetryPolicy,
    stats: FactoryStats,
}

pub struct Orchestrator {
    config: FactoryConfig,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    generation: Mutex<Option<PeriodicDriver>>,
    spawner: Mutex<Option<PeriodicDriver>>,
}

impl Orchestrator {
    pub fn new(config: FactoryConfig) -> Self {
        let shared = Arc::new(Shared {
            directory: RwLock::new(MachineDirectory::new()),
            jobs: JobQueue::new(),
            retry: config.retry,
            stats: FactoryStats::new(),
        });
        Self {
            config,
            shared,
            workers: Mutex::new(Vec::new()),
            generation: Mutex::new(None),
            spawner: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Take ownership of a machine, start its worker, and make it routable
    /// according to its category.
    ///
    /// A machine registered twice, or a second source station, is rejected
    /// before anything is started.
    pub fn register(&self, machine: MachineRef) -> Result<MachineId, OrchestratorError> {
        let mut directory = self
            .shared
            .directory
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if directory.contains(machine.id()) {
            return Err(OrchestratorError::DuplicateMachine(machine.id()));
        }
        if machine.category() == MachineCategory::SourceStation
            && directory.source_station().is_some()
        {
            return Err(OrchestratorError::DuplicateSourceStation);
        }

        let id = machine.id();
        let actor = Arc::new(MachineActor::new(machine));
        actor.start()?;
        directory.insert(actor);
        Ok(id)
    }

    pub fn add_transporter(&self, name: impl Into<String>) -> Result<MachineId, OrchestratorError> {
        self.register(Arc::new(Transporter::new(name, self.config.transit_delay)))
    }

    pub fn add_processor(
        &self,
        name: impl Into<String>,
        transform: impl Transform,
    ) -> Result<MachineId, OrchestratorError> {
        self.register(Arc::new(TypedProcessor::new(name, transform)))
    }

    pub fn add_source_station(
        &self,
        name: impl Into<String>,
    ) -> Result<MachineId, OrchestratorError> {
        self.register(Arc::new(SourceStation::new(name)))
    }

    /// Shared handle to a registered machine, e.g. for inspection.
    pub fn machine(&self, id: MachineId) -> Option<MachineRef> {
        self.directory().machine(id).cloned()
    }

    pub fn actor(&self, id: MachineId) -> Option<Arc<MachineActor>> {
        self.directory().actor(id).cloned()
    }

    /// Run one step synchronously and return its outcome.
    pub fn execute_step(&self, step: &Step) -> StepStatus {
        self.shared.execute_step(step)
    }

    /// Run a job on the calling thread until it finishes or aborts.
    pub fn execute_job(&self, job: Job) -> Result<JobReport, JobError> {
        self.shared.execute_job(job)
    }

    /// Hand a job to the worker pool. Returns as soon as it is queued.
    pub fn enqueue_job(&self, job: Job) -> Result<(), OrchestratorError> {
        self.shared.enqueue_job(job)
    }

    pub fn pending_jobs(&self) -> usize {
        self.shared.jobs.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Start `count` job workers. No-op if the pool is already running.
    pub fn start_workers(&self, count: usize) -> Result<(), OrchestratorError> {
        let mut workers = lock_slot(&self.workers);
        if !workers.is_empty() {
            return Ok(());
        }
        let was_closed = self.shared.jobs.is_closed();
        self.shared.jobs.reopen();
        match pool::spawn_workers(&self.shared, count) {
            Ok(handles) => {
                *workers = handles;
                info!(workers = count, "job workers started");
                Ok(())
            }
            Err(err) => {
                if !was_closed {
                    self.shared.jobs.reopen();
                }
                Err(err)
            }
        }
    }

    /// Close the job queue, wake every worker and join them. Jobs still
    /// queued stay there for the next [`start_workers`](Self::start_workers).
    pub fn stop_workers(&self) {
        let mut workers = lock_slot(&self.workers);
        if workers.is_empty() {
            return;
        }
        self.shared.jobs.close();
        pool::join_workers(std::mem::take(&mut *workers));
        info!(pending = self.shared.jobs.len(), "job workers stopped");
    }

    /// Start the timer that feeds the source station one generate command
    /// per interval, cycling through the generatable kinds.
    pub fn start_resource_generation(&self) -> Result<(), OrchestratorError> {
        let mut slot = lock_slot(&self.generation);
        if slot.is_some() {
            return Ok(());
        }
        let station = self
            .directory()
            .source_station()
            .cloned()
            .ok_or(OrchestratorError::NoSourceStation)?;

        let mut next = 0usize;
        let on_tick = move || {
            let kind = GENERATABLE_KINDS[next % GENERATABLE_KINDS.len()];
            next = next.wrapping_add(1);
            if let Err(err) = station.enqueue(Command::Generate { kind }) {
                warn!(%kind, error = %err, "generate command not enqueued");
            }
        };
        let interval = self.config.generation_interval;
        let driver = PeriodicDriver::spawn("resource-generation", interval, on_tick).map_err(
            |source| OrchestratorError::ThreadSpawn {
                thread: "resource-generation".to_string(),
                source,
            },
        )?;
        *slot = Some(driver);
        Ok(())
    }

    pub fn stop_resource_generation(&self) {
        if let Some(driver) = lock_slot(&self.generation).take() {
            driver.stop();
        }
    }

    /// Enqueue a freshly built job every `interval`, independent of how fast
    /// the workers drain the queue.
    pub fn start_job_spawner<F>(
        &self,
        mut factory: F,
        interval: Duration,
    ) -> Result<(), OrchestratorError>
    where
        F: FnMut() -> Job + Send + 'static,
    {
        let mut slot = lock_slot(&self.spawner);
        if slot.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let on_tick = move || {
            let job = factory();
            let name = job.name().to_string();
            if let Err(err) = shared.enqueue_job(job) {
                warn!(job = %name, error = %err, "spawned job dropped");
            }
        };
        let driver = PeriodicDriver::spawn("job-spawner", interval, on_tick).map_err(|source| {
            OrchestratorError::ThreadSpawn {
                thread: "job-spawner".to_string(),
                source,
            }
        })?;
        *slot = Some(driver);
        Ok(())
    }

    pub fn stop_job_spawner(&self) {
        if let Some(driver) = lock_slot(&self.spawner).take() {
            driver.stop();
        }
    }

    /// Ask the source station for one unit of `kind` outside the timer.
    pub fn request_generation(&self, kind: MaterialKind) -> Result<(), OrchestratorError> {
        let directory = self.directory();
        let station = directory
            .source_station()
            .ok_or(OrchestratorError::NoSourceStation)?;
        station.enqueue(Command::Generate { kind })?;
        Ok(())
    }

    /// Block until at least `target` jobs have completed or aborted.
    /// Returns `false` if `max_wait` elapsed first.
    pub fn wait_for_finished_jobs(&self, target: u64, max_wait: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.stats().jobs_finished() >= target {
                return true;
            }
            if start.elapsed() >= max_wait {
                return false;
            }
            thread::sleep(Duration::from_millis(FINISH_POLL_MS));
        }
    }

    /// Stop the spawner, the worker pool, generation, then every machine in
    /// registration order. Each stage joins its threads; repeat calls are
    /// no-ops.
    pub fn shutdown(&self) {
        self.stop_job_spawner();
        self.stop_workers();
        self.stop_resource_generation();
        for actor in self.directory().actors() {
            actor.stop();
        }
        debug!("orchestrator shut down");
    }

    fn directory(&self) -> std::sync::RwLockReadGuard<'_, MachineDirectory> {
        self.shared
            .directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(FactoryConfig::default())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_slot<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
