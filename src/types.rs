//! Shared identifiers and outcome types used across the factory.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MACHINE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of one machine instance, used for routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(u64);

impl MachineId {
    /// Allocate a fresh identity; never reused within the process.
    pub fn next() -> Self {
        Self(NEXT_MACHINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Which routing table a machine belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MachineCategory {
    Transporter,
    Processor,
    SourceStation,
}

/// Outcome of executing one transport or process command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepStatus {
    /// The command did what it was asked to do.
    Success,
    /// Transient condition (e.g. empty inventory); the step may be attempted again.
    Retry,
    /// Non-retriable failure; the job must abort.
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Success => "success",
            StepStatus::Retry => "retry",
            StepStatus::Error => "error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn machine_ids_are_unique() {
        let ids: HashSet<MachineId> = (0..64).map(|_| MachineId::next()).collect();
        assert_eq!(ids.len(), 64);
    }
}
