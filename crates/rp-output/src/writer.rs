//! The `OutputWriter` trait implemented by tabular writers.

use crate::{ActionEventRow, OutputResult, TickSummaryRow};

/// All methods are infallible from the observer's perspective: errors are
/// stored internally and retrieved with
/// [`SessionOutputObserver::take_error`][crate::SessionOutputObserver::take_error].
pub trait OutputWriter {
    fn write_action_events(&mut self, rows: &[ActionEventRow]) -> OutputResult<()>;

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
