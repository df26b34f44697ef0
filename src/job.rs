//! Jobs: named, ordered sequences of move/process steps.

use std::collections::VecDeque;

use crate::material::MaterialKind;
use crate::types::MachineId;

/// One job-level intent, not yet bound to a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Have `transporter` carry one unit of `kind` from `source` to `destination`.
    Move {
        transporter: MachineId,
        kind: MaterialKind,
        source: MachineId,
        destination: MachineId,
    },
    /// Have `executor` turn one unit of `kind` into `product`.
    Process {
        executor: MachineId,
        kind: MaterialKind,
        product: MaterialKind,
    },
}

impl Step {
    /// The machine that must execute this step.
    pub fn target(&self) -> MachineId {
        match self {
            Step::Move { transporter, .. } => *transporter,
            Step::Process { executor, .. } => *executor,
        }
    }

    pub fn kind(&self) -> MaterialKind {
        match self {
            Step::Move { kind, .. } | Step::Process { kind, .. } => *kind,
        }
    }
}

/// Steps are consumed front to back; a step leaves the job only once it has
/// succeeded.
#[derive(Clone, Debug)]
pub struct Job {
    name: String,
    steps: VecDeque<Step>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push_back(step);
    }

    /// Builder form of [`add_step`](Self::add_step).
    pub fn with_step(mut self, step: Step) -> Self {
        self.add_step(step);
        self
    }

    pub fn move_material(
        self,
        transporter: MachineId,
        kind: MaterialKind,
        source: MachineId,
        destination: MachineId,
    ) -> Self {
        self.with_step(Step::Move {
            transporter,
            kind,
            source,
            destination,
        })
    }

    pub fn process(self, executor: MachineId, kind: MaterialKind, product: MaterialKind) -> Self {
        self.with_step(Step::Process {
            executor,
            kind,
            product,
        })
    }

    pub fn next_step(&self) -> Option<&Step> {
        self.steps.front()
    }

    pub fn pop_step(&mut self) -> Option<Step> {
        self.steps.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}
