//! The `Session` struct and its tick loop.

use std::mem;

use tracing::{debug, info, warn};

use rp_core::{ReplicantId, Tick};
use rp_protocol::{Instruction, RecordSet};
use rp_replicant::{ActionStatus, Behavior, ReplicantController};

use crate::backend::Backend;
use crate::config::SessionConfig;
use crate::manager::AgentManager;
use crate::observer::{SessionObserver, TickSummary};
use crate::{SessionError, SessionResult};

/// Drives an [`AgentManager`] against a [`Backend`], one exchange per tick.
///
/// 1. **Start**: the spawn batch (every member's one-time instructions) is
///    sent at tick 0 and its reply becomes the first tick's records.
/// 2. **Step**: the manager advances on the last reply; the resulting batch,
///    preceded by anything [`queue`][Self::queue]d, goes to the backend and
///    the reply is kept for the next step.
///
/// Create via [`SessionBuilder`][crate::SessionBuilder].
pub struct Session<B: Backend> {
    pub config:  SessionConfig,
    pub manager: AgentManager,

    backend: B,
    /// Reply to the most recent batch.
    records: RecordSet,
    tick:    Tick,
    started: bool,
    /// Caller instructions waiting for the next batch.
    queued:  Vec<Instruction>,
}

impl<B: Backend> Session<B> {
    pub(crate) fn new(config: SessionConfig, manager: AgentManager, backend: B) -> Self {
        Self {
            config,
            manager,
            backend,
            records: RecordSet::new(),
            tick:    Tick::ZERO,
            started: false,
            queued:  Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Records from the most recent exchange.
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn replicant(&self, id: ReplicantId) -> SessionResult<&ReplicantController> {
        self.manager.replicant(id).ok_or(SessionError::UnknownReplicant(id))
    }

    pub fn replicant_mut(&mut self, id: ReplicantId) -> SessionResult<&mut ReplicantController> {
        self.manager.replicant_mut(id).ok_or(SessionError::UnknownReplicant(id))
    }

    // ── Caller surface ────────────────────────────────────────────────────

    /// Ask replicant `id` to start a new behavior.
    pub fn request(&mut self, id: ReplicantId, behavior: Behavior) -> SessionResult<()> {
        self.replicant_mut(id)?.request(behavior)?;
        Ok(())
    }

    /// Send `instruction` at the front of the next batch.
    pub fn queue(&mut self, instruction: Instruction) {
        self.queued.push(instruction);
    }

    pub fn queue_all(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.queued.extend(instructions);
    }

    /// Return every member to its pre-spawn state.  The next
    /// [`start`][Self::start] spawns everything again.
    pub fn reset(&mut self) {
        self.manager.reset();
        self.records = RecordSet::new();
        self.queued.clear();
        self.started = false;
        info!(tick = %self.tick, "session reset");
    }

    // ── Tick loop ─────────────────────────────────────────────────────────

    /// Send the spawn batch.
    pub fn start<O: SessionObserver>(&mut self, observer: &mut O) -> SessionResult<()> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        let mut batch = mem::take(&mut self.queued);
        batch.extend(self.manager.initialization_instructions());
        observer.on_batch(self.tick, &batch);
        self.records = self.exchange(&batch)?;
        self.started = true;

        info!(
            tick = %self.tick,
            replicants = self.manager.replicants().count(),
            instructions = batch.len(),
            "session started"
        );
        observer.on_session_start(self.tick);
        Ok(())
    }

    /// Run one tick.
    pub fn step<O: SessionObserver>(&mut self, observer: &mut O) -> SessionResult<TickSummary> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        self.tick = self.tick + 1;
        let now = self.tick;
        observer.on_tick_start(now);

        let mut batch = mem::take(&mut self.queued);
        batch.extend(self.manager.advance(&self.records));
        for c in self.manager.replicants_mut() {
            if let Some(finished) = c.take_finished() {
                observer.on_action_end(now, c.id(), &finished);
            }
        }

        observer.on_batch(now, &batch);
        self.records = self.exchange(&batch)?;

        let summary = TickSummary {
            tick:         now,
            instructions: batch.len(),
            records:      self.records.len(),
            busy:         self.manager.busy(),
        };
        debug!(
            tick = %now,
            instructions = summary.instructions,
            records = summary.records,
            busy = summary.busy,
            "tick"
        );
        observer.on_tick_end(&summary);
        Ok(summary)
    }

    /// Run exactly `n` ticks.
    pub fn run_ticks<O: SessionObserver>(&mut self, n: u64, observer: &mut O) -> SessionResult<()> {
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Step until replicant `id` has no unfinished action, at most
    /// `config.max_ticks` times.  Returns the status the action ended with.
    pub fn run_until_done<O: SessionObserver>(
        &mut self,
        id:       ReplicantId,
        observer: &mut O,
    ) -> SessionResult<Option<ActionStatus>> {
        let mut steps = 0;
        while !self.replicant(id)?.is_done() {
            if steps == self.config.max_ticks {
                warn!(replicant = id.0, max_ticks = self.config.max_ticks, "action still running at tick cap");
                return Err(SessionError::TickCapReached { max_ticks: self.config.max_ticks });
            }
            self.step(observer)?;
            steps += 1;
        }
        Ok(self.replicant(id)?.status())
    }

    /// Report the end of the session.
    pub fn finish<O: SessionObserver>(&mut self, observer: &mut O) {
        info!(tick = %self.tick, "session finished");
        observer.on_session_end(self.tick);
    }

    fn exchange(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet> {
        self.backend.communicate(batch).inspect_err(|e| {
            warn!(tick = %self.tick, error = %e, "backend exchange failed");
        })
    }
}
