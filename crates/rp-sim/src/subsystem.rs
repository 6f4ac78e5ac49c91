//! The [`Subsystem`] seam and the built-in [`DataRequests`] subsystem.

use rp_protocol::{Frequency, Instruction, RecordSet};

/// Anything the [`AgentManager`][crate::AgentManager] advances once per tick
/// alongside the replicants.
///
/// Subsystems run before every replicant, so the data they ask for is in
/// the same batch as the actions that rely on it.
pub trait Subsystem: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// One-time instructions for the first batch of a session.
    fn initialization_instructions(&mut self) -> Vec<Instruction> {
        Vec::new()
    }

    /// Consume this tick's records and return instructions for the next batch.
    fn advance(&mut self, _records: &RecordSet) -> Vec<Instruction> {
        Vec::new()
    }

    /// Return to the state before `initialization_instructions` was called.
    fn reset(&mut self) {}
}

/// Requests the per-tick output the collision policy and the drop action
/// need but no single replicant asks for.
#[derive(Clone, Debug)]
pub struct DataRequests {
    pub collisions:  bool,
    pub rigidbodies: Frequency,
}

impl DataRequests {
    pub fn new(collisions: bool, rigidbodies: Frequency) -> Self {
        Self { collisions, rigidbodies }
    }
}

impl Default for DataRequests {
    fn default() -> Self {
        Self::new(true, Frequency::Always)
    }
}

impl Subsystem for DataRequests {
    fn name(&self) -> &str {
        "data_requests"
    }

    fn initialization_instructions(&mut self) -> Vec<Instruction> {
        let mut out = Vec::new();
        if self.collisions {
            out.push(Instruction::SendCollisions { enter: true, stay: true, exit: true });
        }
        if self.rigidbodies != Frequency::Never {
            out.push(Instruction::SendRigidbodies { frequency: self.rigidbodies });
        }
        out
    }
}
