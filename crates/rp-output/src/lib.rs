//! `rp-output`: session output writers for the replicant framework.
//!
//! | Writer          | Files created                                   |
//! |-----------------|-------------------------------------------------|
//! | [`CsvWriter`]   | `action_events.csv`, `tick_summaries.csv`       |
//! | [`CommandLog`]  | one JSON line per outgoing batch                |
//!
//! Both are driven by [`SessionOutputObserver`], which implements
//! `rp_sim::SessionObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rp_output::{CommandLog, CsvWriter, SessionOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output")).unwrap();
//! let log = CommandLog::create(Path::new("./output/commands.jsonl")).unwrap();
//! let mut obs = SessionOutputObserver::new(writer).with_command_log(log);
//! session.start(&mut obs)?;
//! session.run_until_done(id, &mut obs)?;
//! session.finish(&mut obs);
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod command_log;
pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use command_log::CommandLog;
pub use crate::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SessionOutputObserver;
pub use row::{ActionEventRow, TickSummaryRow};
pub use writer::OutputWriter;
