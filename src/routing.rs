//! Machine arena and identity-keyed routing of job steps to machines.
//!
//! Every registered machine lives here for the life of the orchestrator.
//! Transporters and processors are additionally indexed in their own table;
//! a step is routed only to the machine whose identity it names, so one
//! request always has exactly one claimant.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::command::Command;
use crate::completion::{CompletionHandle, completion};
use crate::error::RoutingError;
use crate::job::Step;
use crate::machine::{MachineActor, MachineRef};
use crate::types::{MachineCategory, MachineId};

#[derive(Default)]
pub struct MachineDirectory {
    actors: HashMap<MachineId, Arc<MachineActor>>,
    // Registration order, used for ordered shutdown.
    order: Vec<MachineId>,
    transporters: HashSet<MachineId>,
    processors: HashSet<MachineId>,
    source_station: Option<MachineId>,
}

impl MachineDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an actor and index it by its machine's category.
    ///
    /// Returns `false` for an id already present or a second source station;
    /// nothing is recorded then.
    pub fn insert(&mut self, actor: Arc<MachineActor>) -> bool {
        let id = actor.id();
        if self.contains(id) {
            return false;
        }
        match actor.machine().category() {
            MachineCategory::Transporter => {
                self.transporters.insert(id);
            }
            MachineCategory::Processor => {
                self.processors.insert(id);
            }
            MachineCategory::SourceStation => {
                if self.source_station.is_some() {
                    return false;
                }
                self.source_station = Some(id);
            }
        }
        debug!(machine = actor.name(), %id, "registered machine");
        self.order.push(id);
        self.actors.insert(id, actor);
        true
    }

    pub fn contains(&self, id: MachineId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn actor(&self, id: MachineId) -> Option<&Arc<MachineActor>> {
        self.actors.get(&id)
    }

    pub fn machine(&self, id: MachineId) -> Option<&MachineRef> {
        self.actors.get(&id).map(|actor| actor.machine())
    }

    pub fn source_station(&self) -> Option<&Arc<MachineActor>> {
        self.source_station.and_then(|id| self.actors.get(&id))
    }

    /// Actors in registration order.
    pub fn actors(&self) -> impl Iterator<Item = &Arc<MachineActor>> {
        self.order.iter().filter_map(|id| self.actors.get(id))
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Translate a step into a command on the machine it names and enqueue it.
    pub fn route(&self, step: &Step) -> Result<CompletionHandle, RoutingError> {
        match *step {
            Step::Move {
                transporter,
                kind,
                source,
                destination,
            } => {
                let actor = self
                    .indexed(&self.transporters, transporter)
                    .ok_or_else(|| self.miss(transporter, RoutingError::NotATransporter))?;
                let source = self.require(source)?;
                let destination = self.require(destination)?;
                let (done, handle) = completion();
                actor.enqueue(Command::Transport {
                    kind,
                    source,
                    destination,
                    completion: done,
                })?;
                Ok(handle)
            }
            Step::Process { executor, kind, .. } => {
                let actor = self
                    .indexed(&self.processors, executor)
                    .ok_or_else(|| self.miss(executor, RoutingError::NotAProcessor))?;
                let (done, handle) = completion();
                actor.enqueue(Command::Process {
                    kind,
                    completion: done,
                })?;
                Ok(handle)
            }
        }
    }

    fn indexed(&self, table: &HashSet<MachineId>, id: MachineId) -> Option<&Arc<MachineActor>> {
        if table.contains(&id) {
            self.actors.get(&id)
        } else {
            None
        }
    }

    fn require(&self, id: MachineId) -> Result<MachineRef, RoutingError> {
        self.machine(id)
            .cloned()
            .ok_or(RoutingError::UnknownMachine(id))
    }

    fn miss(&self, id: MachineId, wrong_category: fn(MachineId) -> RoutingError) -> RoutingError {
        if self.actors.contains_key(&id) {
            wrong_category(id)
        } else {
            RoutingError::UnknownMachine(id)
        }
    }
}
