//! Per-machine worker runtime: one thread draining one FIFO command queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::command::{Command, CommandQueue};
use crate::error::MachineError;
use crate::machine::{Machine, MachineRef};
use crate::types::{MachineId, StepStatus};

/// Runs a machine's commands on its own worker thread, strictly in enqueue
/// order.
pub struct MachineActor {
    machine: MachineRef,
    queue: Arc<CommandQueue>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MachineActor {
    /// Wrap a machine; the worker is not running until [`start`](Self::start).
    pub fn new(machine: MachineRef) -> Self {
        Self {
            machine,
            queue: Arc::new(CommandQueue::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn id(&self) -> MachineId {
        self.machine.id()
    }

    pub fn name(&self) -> &str {
        self.machine.name()
    }

    pub fn machine(&self) -> &MachineRef {
        &self.machine
    }

    /// Start the worker thread. No-op if it is already running.
    ///
    /// On spawn failure the actor stays stopped.
    pub fn start(&self) -> Result<(), MachineError> {
        let mut slot = self
            .worker
            .lock()
            .map_err(|_| MachineError::QueuePoisoned {
                machine: self.name().to_string(),
            })?;
        if slot.is_some() {
            return Ok(());
        }

        self.queue.resume();
        let machine = Arc::clone(&self.machine);
        let queue = Arc::clone(&self.queue);
        let handle = thread::Builder::new()
            .name(self.name().to_string())
            .spawn(move || worker_loop(machine, queue))
            .map_err(|source| {
                self.queue.request_stop();
                MachineError::ThreadSpawn {
                    machine: self.name().to_string(),
                    source,
                }
            })?;
        *slot = Some(handle);
        debug!(machine = self.name(), "worker started");
        Ok(())
    }

    /// Signal the worker, wake it and join it. No-op if not running.
    ///
    /// Commands still queued are left in place and run after the next
    /// [`start`](Self::start).
    pub fn stop(&self) {
        // Holding the slot across the join keeps a concurrent start from
        // spawning a second consumer before this one has exited.
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = slot.take() else {
            return;
        };
        self.queue.request_stop();
        if handle.join().is_err() {
            error!(machine = self.name(), "worker thread panicked");
        }
        debug!(machine = self.name(), "worker stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Append a command and wake the worker.
    ///
    /// Fails only if the queue itself cannot be mutated; the dropped command's
    /// completion then reports `Error`.
    pub fn enqueue(&self, command: Command) -> Result<(), MachineError> {
        let tag = command.tag();
        let kind = command.kind();
        self.queue
            .push(command)
            .map_err(|_| MachineError::QueuePoisoned {
                machine: self.name().to_string(),
            })?;
        debug!(machine = self.name(), command = tag, %kind, "enqueued command");
        Ok(())
    }

    /// Number of commands waiting for the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for MachineActor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(machine: MachineRef, queue: Arc<CommandQueue>) {
    while let Some(command) = queue.pop_blocking_or_stopped() {
        dispatch(machine.as_ref(), command);
    }
    debug!(machine = machine.name(), "worker loop exited");
}

/// Run one command and fulfil its completion exactly once.
fn dispatch(machine: &dyn Machine, command: Command) {
    debug!(
        machine = machine.name(),
        command = command.tag(),
        kind = %command.kind(),
        "picked up command"
    );
    match command {
        Command::Transport {
            kind,
            source,
            destination,
            completion,
        } => {
            let status = run_handler(machine, "transport", || {
                machine.on_transport(kind, source.as_ref(), destination.as_ref())
            });
            completion.fulfill(status);
        }
        Command::Process { kind, completion } => {
            let status = run_handler(machine, "process", || machine.on_process(kind));
            completion.fulfill(status);
        }
        Command::Generate { kind } => {
            run_handler(machine, "generate", || machine.on_generate(kind));
        }
    }
}

/// Faults and panics never leave the dispatch boundary; both become `Error`.
fn run_handler<F>(machine: &dyn Machine, command: &'static str, handler: F) -> StepStatus
where
    F: FnOnce() -> Result<StepStatus, MachineError>,
{
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            error!(machine = machine.name(), command, error = %err, "command failed");
            StepStatus::Error
        }
        Err(_) => {
            error!(machine = machine.name(), command, "command handler panicked");
            StepStatus::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionHandle, completion};
    use crate::material::{Material, MaterialKind};
    use crate::types::MachineCategory;
    use std::time::Duration;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fault,
        Panic,
    }

    struct Probe {
        id: MachineId,
        behaviour: Behaviour,
        seen: Mutex<Vec<MaterialKind>>,
    }

    impl Probe {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                id: MachineId::next(),
                behaviour,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Machine for Probe {
        fn id(&self) -> MachineId {
            self.id
        }

        fn name(&self) -> &str {
            "probe"
        }

        fn category(&self) -> MachineCategory {
            MachineCategory::Processor
        }

        fn can_accept(&self, _kind: MaterialKind) -> bool {
            false
        }

        fn try_receive(&self, unit: Material) -> Result<(), MachineError> {
            Err(MachineError::Incompatible {
                machine: "probe".to_string(),
                kind: unit.kind(),
            })
        }

        fn on_process(&self, kind: MaterialKind) -> Result<StepStatus, MachineError> {
            self.seen.lock().expect("seen mutex poisoned").push(kind);
            match self.behaviour {
                Behaviour::Succeed => Ok(StepStatus::Success),
                Behaviour::Fault => Err(MachineError::TransformFailed {
                    machine: "probe".to_string(),
                    reason: "jammed".to_string(),
                }),
                Behaviour::Panic => panic!("probe exploded"),
            }
        }
    }

    fn process(actor: &MachineActor, kind: MaterialKind) -> CompletionHandle {
        let (done, handle) = completion();
        actor
            .enqueue(Command::Process {
                kind,
                completion: done,
            })
            .expect("enqueue");
        handle
    }

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn stop_is_idempotent_and_start_resumes() {
        let actor = MachineActor::new(Probe::new(Behaviour::Succeed));
        actor.start().expect("start");
        actor.start().expect("second start is a no-op");
        assert!(actor.is_running());

        actor.stop();
        actor.stop();
        assert!(!actor.is_running());

        // Queued while stopped, executed once restarted.
        let handle = process(&actor, MaterialKind::MetalPipe);
        assert_eq!(handle.wait_timeout(Duration::from_millis(50)), None);
        actor.start().expect("restart");
        assert_eq!(handle.wait_timeout(WAIT), Some(StepStatus::Success));
        actor.stop();
    }

    #[test]
    fn commands_execute_in_enqueue_order() {
        let probe = Probe::new(Behaviour::Succeed);
        let actor = MachineActor::new(probe.clone());
        let kinds = [
            MaterialKind::TitaniumSlab,
            MaterialKind::MetalPipe,
            MaterialKind::Gravel,
        ];
        let handles: Vec<_> = kinds.iter().map(|&kind| process(&actor, kind)).collect();
        assert_eq!(actor.pending(), 3);
        actor.start().expect("start");
        for handle in handles {
            assert_eq!(handle.wait_timeout(WAIT), Some(StepStatus::Success));
        }
        assert_eq!(*probe.seen.lock().expect("seen mutex poisoned"), kinds);
    }

    #[test]
    fn handler_fault_is_reported_as_error() {
        let actor = MachineActor::new(Probe::new(Behaviour::Fault));
        actor.start().expect("start");
        let handle = process(&actor, MaterialKind::MetalPipe);
        assert_eq!(handle.wait_timeout(WAIT), Some(StepStatus::Error));
    }

    #[test]
    fn handler_panic_is_reported_and_worker_survives() {
        let probe = Probe::new(Behaviour::Panic);
        let actor = MachineActor::new(probe.clone());
        actor.start().expect("start");
        let first = process(&actor, MaterialKind::MetalPipe);
        let second = process(&actor, MaterialKind::Gravel);
        assert_eq!(first.wait_timeout(WAIT), Some(StepStatus::Error));
        assert_eq!(second.wait_timeout(WAIT), Some(StepStatus::Error));
        assert_eq!(probe.seen.lock().expect("seen mutex poisoned").len(), 2);
        assert!(actor.is_running());
    }

    #[test]
    fn unhandled_command_defaults_to_error() {
        let actor = MachineActor::new(Probe::new(Behaviour::Succeed));
        let other: MachineRef = Probe::new(Behaviour::Succeed);
        actor.start().expect("start");
        let (done, handle) = completion();
        actor
            .enqueue(Command::Transport {
                kind: MaterialKind::Gravel,
                source: Arc::clone(&other),
                destination: other,
                completion: done,
            })
            .expect("enqueue");
        assert_eq!(handle.wait_timeout(WAIT), Some(StepStatus::Error));
    }

    #[test]
    fn abandoned_commands_report_error_when_actor_is_dropped() {
        let actor = MachineActor::new(Probe::new(Behaviour::Succeed));
        let handle = process(&actor, MaterialKind::MetalPipe);
        drop(actor);
        assert_eq!(handle.wait(), StepStatus::Error);
    }
}
