//! Error types for machines, routing, job execution and the orchestrator.

use std::io;

use thiserror::Error;

use crate::material::MaterialKind;
use crate::types::MachineId;

/// Faults raised by a machine's inventory or command handlers.
#[derive(Debug, Error)]
pub enum MachineError {
    /// Delivery of a kind the machine does not accept.
    #[error("{machine} does not accept {kind}")]
    Incompatible { machine: String, kind: MaterialKind },

    /// A process request for a kind other than the processor's own.
    #[error("{machine} cannot process {got}, configured for {expected}")]
    KindMismatch {
        machine: String,
        got: MaterialKind,
        expected: MaterialKind,
    },

    /// The kind only comes out of processing and has no recipe.
    #[error("{kind} cannot be generated")]
    NotGeneratable { kind: MaterialKind },

    /// The machine has no handler for this command.
    #[error("{machine} does not handle {command} commands")]
    Unsupported {
        machine: String,
        command: &'static str,
    },

    #[error("{machine} failed to transform material: {reason}")]
    TransformFailed { machine: String, reason: String },

    #[error("{machine} inventory lock poisoned")]
    LockPoisoned { machine: String },

    #[error("{machine} command queue poisoned")]
    QueuePoisoned { machine: String },

    #[error("failed to spawn worker for {machine}")]
    ThreadSpawn {
        machine: String,
        #[source]
        source: io::Error,
    },
}

/// Failures turning a step into a command on a concrete machine.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no machine registered as {0}")]
    UnknownMachine(MachineId),

    #[error("{0} is not a registered transporter")]
    NotATransporter(MachineId),

    #[error("{0} is not a registered processor")]
    NotAProcessor(MachineId),

    #[error("enqueue failed: {0}")]
    Enqueue(#[from] MachineError),
}

/// Why a job stopped before its last step. Step numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job '{job}' aborted at step {step}: still retrying after {attempts} attempts")]
    RetriesExhausted {
        job: String,
        step: usize,
        attempts: u32,
    },

    #[error("job '{job}' aborted at step {step}: step failed")]
    StepFailed { job: String, step: usize },
}

impl JobError {
    pub fn job(&self) -> &str {
        match self {
            JobError::RetriesExhausted { job, .. } | JobError::StepFailed { job, .. } => job,
        }
    }

    pub fn step(&self) -> usize {
        match self {
            JobError::RetriesExhausted { step, .. } | JobError::StepFailed { step, .. } => *step,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("only one source station can be registered")]
    DuplicateSourceStation,

    #[error("machine {0} is already registered")]
    DuplicateMachine(MachineId),

    #[error("no source station registered")]
    NoSourceStation,

    #[error("job queue is closed")]
    QueueClosed,

    #[error("failed to spawn {thread} thread")]
    ThreadSpawn {
        thread: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// A kind-specific transform could not produce its output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransformError(pub String);
