//! Plain data row types written by output backends.

use rp_core::{ReplicantId, Tick};
use rp_replicant::{ActionRecord, ActionStatus};

/// One action reaching a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEventRow {
    pub tick:      u64,
    pub replicant: u32,
    pub action:    &'static str,
    /// Motion category, or empty for actions the collision policy ignores.
    pub category:  &'static str,
    /// `"success"` or `"failure"`.
    pub outcome:   &'static str,
    /// Failure reason; empty on success.
    pub reason:    &'static str,
}

impl ActionEventRow {
    pub fn new(tick: Tick, replicant: ReplicantId, action: &ActionRecord) -> Self {
        let (outcome, reason) = match action.status {
            ActionStatus::Failure(r) => ("failure", r.as_str()),
            ActionStatus::Success => ("success", ""),
            ActionStatus::Ongoing => ("ongoing", ""),
        };
        Self {
            tick: tick.0,
            replicant: replicant.0,
            action: action.name,
            category: action.category.map_or("", |c| c.as_str()),
            outcome,
            reason,
        }
    }
}

/// Counters for one session tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:         u64,
    pub instructions: u64,
    pub records:      u64,
    pub busy:         u64,
}
