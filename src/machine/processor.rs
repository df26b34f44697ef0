//! Processors that accept exactly one material kind and transform it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{MachineError, TransformError};
use crate::machine::{Machine, lock_inventory};
use crate::material::{Material, MaterialKind};
use crate::types::{MachineCategory, MachineId, StepStatus};

/// Kind-specific processing capability plugged into a [`TypedProcessor`].
pub trait Transform: Send + Sync + 'static {
    /// The only kind this capability consumes.
    fn input(&self) -> MaterialKind;

    fn output(&self) -> MaterialKind;

    /// Simulated time one unit spends in the machine.
    fn duration(&self) -> Duration;

    fn apply(&self, unit: Material) -> Result<Material, TransformError>;
}

/// Cuts a metal pipe into one half-length piece.
#[derive(Clone, Copy, Debug)]
pub struct CutInHalf {
    duration: Duration,
}

impl CutInHalf {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Transform for CutInHalf {
    fn input(&self) -> MaterialKind {
        MaterialKind::MetalPipe
    }

    fn output(&self) -> MaterialKind {
        MaterialKind::MetalPipeHalf
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn apply(&self, unit: Material) -> Result<Material, TransformError> {
        if unit.kind() != MaterialKind::MetalPipe {
            return Err(TransformError(format!("cannot cut {}", unit.kind())));
        }
        let payload = unit.into_payload();
        let half = payload.slice(..payload.len() / 2);
        Ok(Material::new(MaterialKind::MetalPipeHalf, half))
    }
}

/// A machine bound to one input kind. Received units wait in the input
/// queue; products wait in the output queue for a transporter to collect.
pub struct TypedProcessor {
    id: MachineId,
    name: String,
    transform: Box<dyn Transform>,
    input: Mutex<VecDeque<Material>>,
    output: Mutex<VecDeque<Material>>,
    processed: AtomicU64,
}

impl TypedProcessor {
    pub fn new(name: impl Into<String>, transform: impl Transform) -> Self {
        Self {
            id: MachineId::next(),
            name: name.into(),
            transform: Box::new(transform),
            input: Mutex::new(VecDeque::new()),
            output: Mutex::new(VecDeque::new()),
            processed: AtomicU64::new(0),
        }
    }

    pub fn accepts(&self) -> MaterialKind {
        self.transform.input()
    }

    pub fn produces(&self) -> MaterialKind {
        self.transform.output()
    }

    pub fn input_len(&self) -> usize {
        self.input.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn output_len(&self) -> usize {
        self.output.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Units successfully transformed so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }
}

impl Machine for TypedProcessor {
    fn id(&self) -> MachineId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> MachineCategory {
        MachineCategory::Processor
    }

    fn can_accept(&self, kind: MaterialKind) -> bool {
        kind == self.accepts()
    }

    fn try_receive(&self, unit: Material) -> Result<(), MachineError> {
        if !self.can_accept(unit.kind()) {
            return Err(MachineError::Incompatible {
                machine: self.name.clone(),
                kind: unit.kind(),
            });
        }
        let kind = unit.kind();
        lock_inventory(&self.name, &self.input)?.push_back(unit);
        debug!(machine = %self.name, %kind, "received material");
        Ok(())
    }

    fn take_material(&self, kind: MaterialKind) -> Result<Option<Material>, MachineError> {
        let mut output = lock_inventory(&self.name, &self.output)?;
        if output.front().is_some_and(|unit| unit.kind() == kind) {
            Ok(output.pop_front())
        } else {
            Ok(None)
        }
    }

    fn on_process(&self, kind: MaterialKind) -> Result<StepStatus, MachineError> {
        if kind != self.accepts() {
            error!(
                machine = %self.name,
                got = %kind,
                expected = %self.accepts(),
                "process request for wrong kind"
            );
            return Err(MachineError::KindMismatch {
                machine: self.name.clone(),
                got: kind,
                expected: self.accepts(),
            });
        }

        // Input lock is released before the simulated work starts.
        let next = lock_inventory(&self.name, &self.input)?.pop_front();
        let Some(unit) = next else {
            debug!(machine = %self.name, %kind, "input empty, retry later");
            return Ok(StepStatus::Retry);
        };

        let duration = self.transform.duration();
        if !duration.is_zero() {
            thread::sleep(duration);
        }
        let product = self
            .transform
            .apply(unit)
            .map_err(|err| MachineError::TransformFailed {
                machine: self.name.clone(),
                reason: err.to_string(),
            })?;
        let product_kind = product.kind();
        if product_kind != self.produces() {
            return Err(MachineError::TransformFailed {
                machine: self.name.clone(),
                reason: format!("produced {product_kind}, expected {}", self.produces()),
            });
        }
        lock_inventory(&self.name, &self.output)?.push_back(product);
        self.processed.fetch_add(1, Ordering::SeqCst);
        info!(machine = %self.name, input = %kind, output = %product_kind, "processed material");
        Ok(StepStatus::Success)
    }
}
