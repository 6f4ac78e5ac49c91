//! `SessionOutputObserver<W>`: bridges `SessionObserver` to the writers.

use std::fs::File;
use std::io::{BufWriter, Write};

use rp_core::{ReplicantId, Tick};
use rp_protocol::Instruction;
use rp_replicant::ActionRecord;
use rp_sim::{SessionObserver, TickSummary};

use crate::command_log::CommandLog;
use crate::row::{ActionEventRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SessionObserver`] that writes action events and tick summaries to an
/// [`OutputWriter`], and optionally every batch to a [`CommandLog`].
///
/// Errors are stored internally because `SessionObserver` methods have no
/// return value.  Check with [`take_error`][Self::take_error] once the
/// session is done.
pub struct SessionOutputObserver<W: OutputWriter, L: Write = BufWriter<File>> {
    writer:     W,
    log:        Option<CommandLog<L>>,
    /// Events of the current tick, written with its summary.
    events:     Vec<ActionEventRow>,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SessionOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, log: None, events: Vec::new(), last_error: None }
    }
}

impl<W: OutputWriter, L: Write> SessionOutputObserver<W, L> {
    pub fn with_command_log<L2: Write>(self, log: CommandLog<L2>) -> SessionOutputObserver<W, L2> {
        SessionOutputObserver {
            writer:     self.writer,
            log:        Some(log),
            events:     self.events,
            last_error: self.last_error,
        }
    }

    /// Take the stored write error (if any).
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_parts(self) -> (W, Option<CommandLog<L>>) {
        (self.writer, self.log)
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter, L: Write> SessionObserver for SessionOutputObserver<W, L> {
    fn on_batch(&mut self, tick: Tick, batch: &[Instruction]) {
        if let Some(log) = self.log.as_mut() {
            let result = log.log(tick, batch);
            self.store_err(result);
        }
    }

    fn on_action_end(&mut self, tick: Tick, replicant: ReplicantId, action: &ActionRecord) {
        self.events.push(ActionEventRow::new(tick, replicant, action));
    }

    fn on_tick_end(&mut self, summary: &TickSummary) {
        if !self.events.is_empty() {
            let events = std::mem::take(&mut self.events);
            let result = self.writer.write_action_events(&events);
            self.store_err(result);
        }
        let row = TickSummaryRow {
            tick:         summary.tick.0,
            instructions: summary.instructions as u64,
            records:      summary.records as u64,
            busy:         summary.busy as u64,
        };
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_session_end(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
        if let Some(log) = self.log.as_mut() {
            let result = log.flush();
            self.store_err(result);
        }
    }
}
