//! Session observer trait for progress reporting and data collection.

use rp_core::{ReplicantId, Tick};
use rp_protocol::Instruction;
use rp_replicant::ActionRecord;

/// Per-tick counters handed to [`SessionObserver::on_tick_end`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub tick:         Tick,
    /// Instructions sent this tick.
    pub instructions: usize,
    /// Records received in reply.
    pub records:      usize,
    /// Replicants whose action is still running.
    pub busy:         usize,
}

/// Callbacks invoked by [`Session`][crate::Session] at key points in the
/// tick loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
pub trait SessionObserver {
    /// Called once after the spawn batch has been exchanged.
    fn on_session_start(&mut self, _tick: Tick) {}

    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called with every outgoing batch, including the spawn batch, right
    /// before it goes to the backend.
    fn on_batch(&mut self, _tick: Tick, _batch: &[Instruction]) {}

    /// Called once per action that reached a terminal status this tick.
    fn on_action_end(&mut self, _tick: Tick, _replicant: ReplicantId, _action: &ActionRecord) {}

    fn on_tick_end(&mut self, _summary: &TickSummary) {}

    /// Called by [`Session::finish`][crate::Session::finish].
    fn on_session_end(&mut self, _final_tick: Tick) {}
}

/// A [`SessionObserver`] that does nothing.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
