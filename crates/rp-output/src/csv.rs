//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `action_events.csv`
//! - `tick_summaries.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{ActionEventRow, OutputResult, TickSummaryRow};

pub struct CsvWriter {
    events:    Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut events = Writer::from_path(dir.join("action_events.csv"))?;
        events.write_record(["tick", "replicant", "action", "category", "outcome", "reason"])?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(["tick", "instructions", "records", "busy"])?;

        Ok(Self { events, summaries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_action_events(&mut self, rows: &[ActionEventRow]) -> OutputResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.tick.to_string(),
                row.replicant.to_string(),
                row.action.to_owned(),
                row.category.to_owned(),
                row.outcome.to_owned(),
                row.reason.to_owned(),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.instructions.to_string(),
            row.records.to_string(),
            row.busy.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
