use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::BatchError;

/// Result returned by a [`RowTransform`]: `Ok(None)` drops the row, an error aborts the read.
pub type RowTransformResult<T> = Result<Option<T>, BatchError>;

/// Result returned by [`BatchSink`] callbacks.
pub type BatchSinkResult = Result<(), BatchError>;

/// Converts one raw row into a domain record.
///
/// The reader calls the transform once per data row with:
/// - `header`: the first row read after the skipped rows,
/// - `row`: the current data row,
/// - `previous`: the last record this transform emitted, or `None` before the first one.
///
/// Returning `Ok(None)` skips the row without touching `previous`. Returning an
/// error stops the whole read and the error is handed back to the caller of `read()`.
///
/// Any closure with the matching signature is a `RowTransform`.
pub trait RowTransform<R: ?Sized, T> {
    fn transform(&self, header: &R, row: &R, previous: Option<&T>) -> RowTransformResult<T>;
}

impl<R, T, F> RowTransform<R, T> for F
where
    R: ?Sized,
    F: Fn(&R, &R, Option<&T>) -> RowTransformResult<T>,
{
    fn transform(&self, header: &R, row: &R, previous: Option<&T>) -> RowTransformResult<T> {
        self(header, row, previous)
    }
}

/// Receives the records produced by a reader, one batch at a time.
///
/// `on_batch` runs synchronously on the reader's thread. The slice is only
/// borrowed for the duration of the call: the reader clears and reuses the
/// underlying buffer afterwards, so a sink that needs the records later has
/// to copy them.
pub trait BatchSink<T> {
    fn on_batch(&self, batch: &[T]) -> BatchSinkResult;

    /// Called once after the last batch with the totals of the read.
    fn on_complete(&self, _total_records: usize, _total_batches: usize) -> BatchSinkResult {
        Ok(())
    }
}

/// Summary of one `read()` call.
#[derive(Debug)]
pub struct ReadExecution {
    /// Identifier used in the log lines of this read
    pub id: Uuid,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    /// Number of records handed to the sink
    pub total_records: usize,
    /// Number of `on_batch` calls, including the final partial batch
    pub total_batches: usize,
    /// Number of data rows the transform dropped by returning `None`
    pub filtered_rows: usize,
}
