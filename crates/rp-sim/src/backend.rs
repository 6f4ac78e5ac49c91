//! The simulation-backend boundary.
//!
//! A [`Backend`] takes one ordered instruction batch and synchronously
//! returns the records of the following tick.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use rp_protocol::{Instruction, JsonRecordReader, RecordReader, RecordSet, encode_batch};

use crate::error::{SessionError, SessionResult};

pub trait Backend {
    fn communicate(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn communicate(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet> {
        (**self).communicate(batch)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn communicate(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet> {
        (**self).communicate(batch)
    }
}

// ── ScriptedBackend ───────────────────────────────────────────────────────────

/// Replays queued responses and keeps every batch it was sent.
///
/// Once the queue runs dry it answers with the `idle` response (empty unless
/// set), which makes "the world stops changing" easy to express.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    responses: VecDeque<RecordSet>,
    idle:      RecordSet,
    sent:      Vec<Vec<Instruction>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&mut self, records: RecordSet) {
        self.responses.push_back(records);
    }

    pub fn with_response(mut self, records: RecordSet) -> Self {
        self.push_response(records);
        self
    }

    /// Response used whenever the queue is empty.
    pub fn with_idle(mut self, records: RecordSet) -> Self {
        self.idle = records;
        self
    }

    pub fn set_idle(&mut self, records: RecordSet) {
        self.idle = records;
    }

    pub fn pending(&self) -> usize {
        self.responses.len()
    }

    /// Every batch received, oldest first.
    pub fn sent(&self) -> &[Vec<Instruction>] {
        &self.sent
    }

    pub fn last_sent(&self) -> Option<&[Instruction]> {
        self.sent.last().map(Vec::as_slice)
    }
}

impl Backend for ScriptedBackend {
    fn communicate(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet> {
        self.sent.push(batch.to_vec());
        Ok(self.responses.pop_front().unwrap_or_else(|| self.idle.clone()))
    }
}

// ── StdioBackend ──────────────────────────────────────────────────────────────

/// Line-delimited JSON over a pair of byte streams.
///
/// Each batch is written as one JSON array followed by a newline.  The reply
/// is one line holding a record or an array of records.
pub struct StdioBackend<R, W> {
    reader:  R,
    writer:  W,
    decoder: JsonRecordReader,
    line:    String,
}

impl<R: BufRead, W: Write> StdioBackend<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer, decoder: JsonRecordReader::new(), line: String::new() }
    }

    /// Fail on record types this crate does not know instead of skipping them.
    pub fn strict(mut self) -> Self {
        self.decoder = JsonRecordReader::strict();
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Backend for StdioBackend<R, W> {
    fn communicate(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet> {
        let bytes = encode_batch(batch)?;
        self.writer.write_all(&bytes)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Err(SessionError::BackendClosed);
        }
        let raw = self.line.trim_end();
        if raw.is_empty() {
            return Ok(RecordSet::new());
        }
        Ok(self.decoder.read(&[raw.as_bytes().to_vec()])?)
    }
}
