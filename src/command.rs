//! Machine commands and the per-machine FIFO command queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex};

use crate::completion::Completion;
use crate::machine::MachineRef;
use crate::material::MaterialKind;

/// An addressed instruction placed on one machine's queue.
pub enum Command {
    /// Move one unit of `kind` from `source` to `destination`.
    Transport {
        kind: MaterialKind,
        source: MachineRef,
        destination: MachineRef,
        completion: Completion,
    },
    /// Turn one queued input unit into an output unit.
    Process {
        kind: MaterialKind,
        completion: Completion,
    },
    /// Manufacture one raw unit. Fire-and-forget.
    Generate { kind: MaterialKind },
}

impl Command {
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Transport { .. } => "transport",
            Command::Process { .. } => "process",
            Command::Generate { .. } => "generate",
        }
    }

    pub fn kind(&self) -> MaterialKind {
        match self {
            Command::Transport { kind, .. }
            | Command::Process { kind, .. }
            | Command::Generate { kind } => *kind,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Transport {
                kind,
                source,
                destination,
                ..
            } => f
                .debug_struct("Transport")
                .field("kind", kind)
                .field("source", &source.name())
                .field("destination", &destination.name())
                .finish_non_exhaustive(),
            Command::Process { kind, .. } => f
                .debug_struct("Process")
                .field("kind", kind)
                .finish_non_exhaustive(),
            Command::Generate { kind } => f.debug_struct("Generate").field("kind", kind).finish(),
        }
    }
}

/// Synchronized FIFO feeding exactly one machine worker.
pub struct CommandQueue {
    inner: Mutex<CommandQueueState>,
    available: Condvar,
}

struct CommandQueueState {
    commands: VecDeque<Command>,
    stopping: bool,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CommandQueueState {
                commands: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a command and wake the worker. Hands the command back if the
    /// queue lock is poisoned; the queue is left untouched in that case.
    pub fn push(&self, command: Command) -> Result<(), Command> {
        let Ok(mut guard) = self.inner.lock() else {
            return Err(command);
        };
        guard.commands.push_back(command);
        self.available.notify_one();
        Ok(())
    }

    /// Block until a command is available or a stop is requested.
    ///
    /// A pending stop wins over queued commands: whatever is still queued stays
    /// there for the next worker started on this queue.
    pub fn pop_blocking_or_stopped(&self) -> Option<Command> {
        let mut guard = self.inner.lock().ok()?;
        loop {
            if guard.stopping {
                return None;
            }
            if let Some(command) = guard.commands.pop_front() {
                return Some(command);
            }
            guard = self.available.wait(guard).ok()?;
        }
    }

    /// Pop immediately without blocking.
    pub fn try_pop(&self) -> Option<Command> {
        self.inner.lock().ok()?.commands.pop_front()
    }

    /// Ask the consumer to exit and wake it.
    pub fn request_stop(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.stopping = true;
        }
        self.available.notify_all();
    }

    /// Clear a previous stop request so a new worker can consume again.
    pub fn resume(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.stopping = false;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|guard| guard.commands.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
