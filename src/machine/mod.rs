//! Machine behaviour contract plus the concrete machines.
//!
//! A [`Machine`] owns its inventory and knows how to execute commands; the
//! [`MachineActor`] wraps one in a dedicated worker thread fed by a FIFO
//! command queue. Other machines only ever touch a machine through
//! [`Machine::try_receive`] and [`Machine::take_material`].

mod actor;
mod processor;
mod source;
mod transporter;

use std::sync::{Arc, Mutex, MutexGuard};

pub use actor::MachineActor;
pub use processor::{CutInHalf, Transform, TypedProcessor};
pub use source::SourceStation;
pub use transporter::Transporter;

use crate::error::MachineError;
use crate::material::{Material, MaterialKind};
use crate::types::{MachineCategory, MachineId, StepStatus};

/// Shared handle to a machine's behaviour and inventory.
pub type MachineRef = Arc<dyn Machine>;

pub trait Machine: Send + Sync + 'static {
    fn id(&self) -> MachineId;

    fn name(&self) -> &str;

    fn category(&self) -> MachineCategory;

    fn can_accept(&self, kind: MaterialKind) -> bool;

    /// Synchronous delivery into this machine's inventory.
    ///
    /// Fails with [`MachineError::Incompatible`] for kinds the machine does
    /// not take; the inventory is untouched on failure.
    fn try_receive(&self, unit: Material) -> Result<(), MachineError>;

    /// Withdraw one unit of `kind` if one is ready, without blocking.
    ///
    /// `Ok(None)` means nothing is ready yet; `Err` is a fault that retrying
    /// will not clear.
    fn take_material(&self, _kind: MaterialKind) -> Result<Option<Material>, MachineError> {
        Ok(None)
    }

    fn on_transport(
        &self,
        _kind: MaterialKind,
        _source: &dyn Machine,
        _destination: &dyn Machine,
    ) -> Result<StepStatus, MachineError> {
        Err(unsupported(self.name(), "transport"))
    }

    fn on_process(&self, _kind: MaterialKind) -> Result<StepStatus, MachineError> {
        Err(unsupported(self.name(), "process"))
    }

    fn on_generate(&self, _kind: MaterialKind) -> Result<StepStatus, MachineError> {
        Err(unsupported(self.name(), "generate"))
    }
}

fn unsupported(machine: &str, command: &'static str) -> MachineError {
    MachineError::Unsupported {
        machine: machine.to_string(),
        command,
    }
}

/// Lock an inventory queue, mapping poisoning to a machine fault.
pub(crate) fn lock_inventory<'a, T>(
    machine: &str,
    inventory: &'a Mutex<T>,
) -> Result<MutexGuard<'a, T>, MachineError> {
    inventory.lock().map_err(|_| MachineError::LockPoisoned {
        machine: machine.to_string(),
    })
}
