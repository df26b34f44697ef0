//! The raw-material source: manufactures units on demand, accepts none.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::error::MachineError;
use crate::machine::{Machine, lock_inventory};
use crate::material::{Material, MaterialKind};
use crate::types::{MachineCategory, MachineId, StepStatus};

/// Keeps one queue of manufactured units per kind.
pub struct SourceStation {
    id: MachineId,
    name: String,
    inventory: Mutex<HashMap<MaterialKind, VecDeque<Material>>>,
    generated: AtomicU64,
}

impl SourceStation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: MachineId::next(),
            name: name.into(),
            inventory: Mutex::new(HashMap::new()),
            generated: AtomicU64::new(0),
        }
    }

    pub fn has_material(&self, kind: MaterialKind) -> bool {
        self.stock(kind) > 0
    }

    /// Units of `kind` waiting for pickup.
    pub fn stock(&self, kind: MaterialKind) -> usize {
        self.inventory
            .lock()
            .map(|inventory| inventory.get(&kind).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Total units manufactured since startup.
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::SeqCst)
    }
}

impl Machine for SourceStation {
    fn id(&self) -> MachineId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> MachineCategory {
        MachineCategory::SourceStation
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

    fn take_material(&self, kind: MaterialKind) -> Result<Option<Material>, MachineError> {
        let unit = lock_inventory(&self.name, &self.inventory)?
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        if unit.is_some() {
            debug!(machine = %self.name, %kind, "dispensed material");
        }
        Ok(unit)
    }

    fn on_generate(&self, kind: MaterialKind) -> Result<StepStatus, MachineError> {
        let unit = Material::manufacture(kind).ok_or(MachineError::NotGeneratable { kind })?;
        lock_inventory(&self.name, &self.inventory)?
            .entry(kind)
            .or_default()
            .push_back(unit);
        self.generated.fetch_add(1, Ordering::SeqCst);
        trace!(machine = %self.name, %kind, "generated material");
        Ok(StepStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_units_are_dispensed_fifo_per_kind() {
        let station = SourceStation::new("station");
        station.on_generate(MaterialKind::MetalPipe).expect("pipe");
        station.on_generate(MaterialKind::Gravel).expect("gravel");
        station.on_generate(MaterialKind::MetalPipe).expect("pipe");

        assert_eq!(station.stock(MaterialKind::MetalPipe), 2);
        assert_eq!(station.stock(MaterialKind::Gravel), 1);
        assert!(!station.has_material(MaterialKind::TitaniumSlab));
        assert_eq!(station.generated(), 3);

        let unit = station
            .take_material(MaterialKind::Gravel)
            .expect("no fault")
            .expect("gravel available");
        assert_eq!(unit.kind(), MaterialKind::Gravel);
        assert!(station.take_material(MaterialKind::Gravel).expect("no fault").is_none());
        assert!(
            station
                .take_material(MaterialKind::TitaniumSlab)
                .expect("no fault")
                .is_none()
        );
    }

    #[test]
    fn derived_kinds_are_not_generated() {
        let station = SourceStation::new("station");
        let err = station
            .on_generate(MaterialKind::MetalPipeHalf)
            .expect_err("halves come from the cutter");
        assert!(matches!(err, MachineError::NotGeneratable { .. }));
        assert!(station.on_generate(MaterialKind::Invalid).is_err());
        assert_eq!(station.generated(), 0);
    }

    #[test]
    fn deliveries_are_refused() {
        let station = SourceStation::new("station");
        let pipe = Material::manufacture(MaterialKind::MetalPipe).expect("pipe recipe");
        assert!(station.try_receive(pipe).is_err());
        assert!(!station.has_material(MaterialKind::MetalPipe));
    }

    #[test]
    fn poisoned_inventory_is_a_fault_not_an_empty_shelf() {
        use crate::machine::{CutInHalf, Transporter, TypedProcessor};
        use std::time::Duration;

        let station = SourceStation::new("station");
        station.on_generate(MaterialKind::MetalPipe).expect("pipe");
        std::thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _guard = station.inventory.lock().expect("inventory lock");
                panic!("poison the inventory");
            });
            assert!(poisoner.join().is_err());
        });

        let err = station
            .take_material(MaterialKind::MetalPipe)
            .expect_err("poisoned lock");
        assert!(matches!(err, MachineError::LockPoisoned { .. }));

        // A transporter reports the fault instead of asking for a retry.
        let arm = Transporter::new("arm", Duration::ZERO);
        let cutter = TypedProcessor::new("cutter", CutInHalf::new(Duration::ZERO));
        let err = arm
            .on_transport(MaterialKind::MetalPipe, &station, &cutter)
            .expect_err("fault propagates");
        assert!(matches!(err, MachineError::LockPoisoned { .. }));
        assert_eq!(cutter.input_len(), 0);
    }
}
