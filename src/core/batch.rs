use std::time::Instant;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::BatchError;

use super::item::{BatchSink, ReadExecution, RowTransform};

/// Number of records per batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, PartialEq)]
pub enum BatchStatus {
    Continuable,
    Full,
}

/// Options shared by every reader, whatever the file format.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Maximum number of records handed to the sink at once
    pub batch_size: usize,
    /// Number of leading rows discarded before the header row
    pub skip: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip: 0,
        }
    }
}

impl ReadOptions {
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.batch_size == 0 {
            return Err(BatchError::InvalidArgument(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bounded buffer of transformed records.
pub struct Batch<T> {
    items: Vec<T>,
    batch_size: usize,
}

impl<T> Batch<T> {
    pub fn new(batch_size: usize) -> Batch<T> {
        Batch {
            items: Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE)),
            batch_size,
        }
    }

    pub fn push(&mut self, item: T) -> BatchStatus {
        self.items.push(item);
        if self.items.len() >= self.batch_size {
            BatchStatus::Full
        } else {
            BatchStatus::Continuable
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empties the buffer, keeping its allocation, and returns the last record it held.
    pub fn clear(&mut self) -> Option<T> {
        let last = self.items.pop();
        self.items.clear();
        last
    }
}

/// Drives the read state machine over a stream of rows.
///
/// The first row is the header. Every following row goes through `transform`;
/// emitted records are accumulated and handed to `sink` each time `batch_size`
/// of them are available, then once more for the remainder. `on_complete` is
/// always called, even when the stream held no data rows.
pub(crate) fn stream_rows<R, T, I>(
    mut rows: I,
    batch_size: usize,
    transform: &dyn RowTransform<R, T>,
    sink: &dyn BatchSink<T>,
) -> Result<ReadExecution, BatchError>
where
    I: Iterator<Item = Result<R, BatchError>>,
{
    let id = Uuid::new_v4();
    let start = Instant::now();
    info!("Start of read: {}", id);

    let mut batch = Batch::new(batch_size);
    // Last record of the previous batch, kept once the buffer is cleared.
    let mut carried: Option<T> = None;
    let mut total_records = 0;
    let mut total_batches = 0;
    let mut filtered_rows = 0;

    match rows.next().transpose()? {
        Some(header) => {
            debug!("Header row captured");

            for row in rows {
                let row = row?;
                let previous = batch.last().or(carried.as_ref());

                match transform.transform(&header, &row, previous)? {
                    Some(record) => {
                        total_records += 1;
                        if batch.push(record) == BatchStatus::Full {
                            total_batches += 1;
                            debug!("Flushing batch {} of {} records", total_batches, batch.len());
                            sink.on_batch(batch.items())?;
                            carried = batch.clear();
                        }
                    }
                    None => filtered_rows += 1,
                }
            }
        }
        None => warn!("No header row found, the source is empty"),
    }

    if !batch.is_empty() {
        total_batches += 1;
        debug!("Flushing last batch of {} records", batch.len());
        sink.on_batch(batch.items())?;
        batch.clear();
    }

    sink.on_complete(total_records, total_batches)?;

    info!(
        "End of read: {}, records: {}, batches: {}, filtered rows: {}",
        id, total_records, total_batches, filtered_rows
    );

    Ok(ReadExecution {
        id,
        start,
        end: Instant::now(),
        duration: start.elapsed(),
        total_records,
        total_batches,
        filtered_rows,
    })
}
