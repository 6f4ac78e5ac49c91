//! JSON-lines log of every batch sent to the backend.
//!
//! ```json
//! {"tick":3,"batch":[{"$type":"rotate_object_by","angle":90.0,...}]}
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use rp_core::Tick;
use rp_protocol::Instruction;

use crate::OutputResult;

#[derive(Serialize)]
struct Line<'a> {
    tick:  u64,
    batch: &'a [Instruction],
}

pub struct CommandLog<W: Write> {
    out:     W,
    batches: u64,
    /// Skip batches with no instructions.
    skip_empty: bool,
}

impl CommandLog<BufWriter<File>> {
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CommandLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, batches: 0, skip_empty: false }
    }

    pub fn skip_empty(mut self) -> Self {
        self.skip_empty = true;
        self
    }

    /// Batches written so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn log(&mut self, tick: Tick, batch: &[Instruction]) -> OutputResult<()> {
        if self.skip_empty && batch.is_empty() {
            return Ok(());
        }
        serde_json::to_writer(&mut self.out, &Line { tick: tick.0, batch })?;
        self.out.write_all(b"\n")?;
        self.batches += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> OutputResult<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
