//! Transporters relay one unit at a time between two other machines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::MachineError;
use crate::machine::Machine;
use crate::material::{Material, MaterialKind};
use crate::types::{MachineCategory, MachineId, StepStatus};

pub struct Transporter {
    id: MachineId,
    name: String,
    transit: Duration,
    moved: AtomicU64,
}

impl Transporter {
    pub fn new(name: impl Into<String>, transit: Duration) -> Self {
        Self {
            id: MachineId::next(),
            name: name.into(),
            transit,
            moved: AtomicU64::new(0),
        }
    }

    /// Units delivered so far.
    pub fn moved(&self) -> u64 {
        self.moved.load(Ordering::SeqCst)
    }
}

impl Machine for Transporter {
    fn id(&self) -> MachineId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> MachineCategory {
        MachineCategory::Transporter
    }

    fn can_accept(&self, _kind: MaterialKind) -> bool {
        false
    }

    fn try_receive(&self, unit: Material) -> Result<(), MachineError> {
        Err(MachineError::Incompatible {
            machine: self.name.clone(),
            kind: unit.kind(),
        })
    }

    fn on_transport(
        &self,
        kind: MaterialKind,
        source: &dyn Machine,
        destination: &dyn Machine,
    ) -> Result<StepStatus, MachineError> {
        let Some(unit) = source.take_material(kind)? else {
            debug!(
                machine = %self.name,
                source = source.name(),
                %kind,
                "nothing to pick up, retry later"
            );
            return Ok(StepStatus::Retry);
        };

        if !self.transit.is_zero() {
            thread::sleep(self.transit);
        }

        // The unit has already left the source; a rejected delivery loses it.
        if let Err(err) = destination.try_receive(unit) {
            warn!(
                machine = %self.name,
                destination = destination.name(),
                %kind,
                error = %err,
                "delivery rejected, unit lost"
            );
            return Err(err);
        }

        self.moved.fetch_add(1, Ordering::SeqCst);
        info!(
            machine = %self.name,
            source = source.name(),
            destination = destination.name(),
            %kind,
            "moved material"
        );
        Ok(StepStatus::Success)
    }
}
