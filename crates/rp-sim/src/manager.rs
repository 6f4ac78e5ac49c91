//! `AgentManager`: merges subsystems and replicants into one batch per tick.

use tracing::debug;

use rp_core::ReplicantId;
use rp_protocol::{Instruction, RecordSet};
use rp_replicant::ReplicantController;

use crate::error::{SessionError, SessionResult};
use crate::subsystem::Subsystem;

/// Ordered set of subsystems and replicant controllers.
///
/// Every tick the subsystems advance first, in registration order, then the
/// replicants, in registration order.  Their instructions are concatenated
/// in that order.
#[derive(Default)]
pub struct AgentManager {
    subsystems: Vec<Box<dyn Subsystem>>,
    replicants: Vec<ReplicantController>,
    initialized: bool,
}

impl AgentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subsystem(&mut self, subsystem: Box<dyn Subsystem>) {
        self.subsystems.push(subsystem);
    }

    /// Register a replicant.  Ids must be unique.
    pub fn add_replicant(&mut self, controller: ReplicantController) -> SessionResult<()> {
        let id = controller.id();
        if self.replicant(id).is_some() {
            return Err(SessionError::DuplicateReplicant(id));
        }
        self.replicants.push(controller);
        Ok(())
    }

    pub fn replicant(&self, id: ReplicantId) -> Option<&ReplicantController> {
        self.replicants.iter().find(|c| c.id() == id)
    }

    pub fn replicant_mut(&mut self, id: ReplicantId) -> Option<&mut ReplicantController> {
        self.replicants.iter_mut().find(|c| c.id() == id)
    }

    pub fn replicants(&self) -> impl Iterator<Item = &ReplicantController> + '_ {
        self.replicants.iter()
    }

    pub fn replicants_mut(&mut self) -> impl Iterator<Item = &mut ReplicantController> + '_ {
        self.replicants.iter_mut()
    }

    pub fn subsystem_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.subsystems.iter().map(|s| s.name())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Replicants whose current action has not finished.
    pub fn busy(&self) -> usize {
        self.replicants.iter().filter(|c| !c.is_done()).count()
    }

    /// The first batch of a session: every subsystem's and every replicant's
    /// one-time instructions.
    pub fn initialization_instructions(&mut self) -> Vec<Instruction> {
        let mut out = Vec::new();
        for s in &mut self.subsystems {
            out.extend(s.initialization_instructions());
        }
        for c in &mut self.replicants {
            out.extend(c.initialization_instructions());
        }
        self.initialized = true;
        out
    }

    /// Advance everything on one tick's records.
    pub fn advance(&mut self, records: &RecordSet) -> Vec<Instruction> {
        let mut out = Vec::new();
        for s in &mut self.subsystems {
            let batch = s.advance(records);
            if !batch.is_empty() {
                debug!(subsystem = s.name(), instructions = batch.len(), "subsystem advanced");
            }
            out.extend(batch);
        }
        for c in &mut self.replicants {
            out.extend(c.advance(records));
        }
        out
    }

    /// Return every member to its pre-spawn state.
    pub fn reset(&mut self) {
        for s in &mut self.subsystems {
            s.reset();
        }
        for c in &mut self.replicants {
            c.reset(None, None);
        }
        self.initialized = false;
    }
}

impl std::fmt::Debug for AgentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentManager")
            .field("subsystems", &self.subsystem_names().collect::<Vec<_>>())
            .field("replicants", &self.replicants)
            .field("initialized", &self.initialized)
            .finish()
    }
}
