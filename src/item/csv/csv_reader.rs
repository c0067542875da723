use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use csv::{StringRecord, Terminator, Trim};
use log::debug;
use serde::de::DeserializeOwned;

use crate::{
    core::{
        batch::{ReadOptions, stream_rows},
        item::{BatchSink, ReadExecution, RowTransform, RowTransformResult},
    },
    error::BatchError,
};

use super::CsvDialect;

/// A batched CSV reader.
///
/// The reader streams the records of a delimited file without loading it in
/// memory. After the configured number of leading lines is skipped, the
/// first record is kept as the header row; every following record is handed
/// to the transform, and the records it emits reach the sink in batches.
///
/// A `CsvItemReader` is immutable: every call to [`read`](Self::read) opens the
/// source again and runs the whole state machine from the start.
///
/// # Implementation Details
///
/// - Parsing is flexible: rows may have fewer or more fields than the header,
///   the transform decides what to do with them
/// - Skipped rows are physical lines, counted before parsing: a blank line or
///   one line of a quoted multi-line field each count as one
/// - Empty lines after the skipped ones are ignored by the parser
/// - Rows are decoded as UTF-8 `StringRecord`s; a row that is not valid UTF-8
///   aborts the read with `BatchError::ItemReader` before reaching the transform
/// - Parse errors abort the read with `BatchError::ItemReader`
pub struct CsvItemReader<'a, T> {
    path: PathBuf,
    dialect: CsvDialect,
    options: ReadOptions,
    transform: Box<dyn RowTransform<StringRecord, T> + 'a>,
    sink: &'a dyn BatchSink<T>,
}

impl<T> CsvItemReader<'_, T> {
    /// Reads the whole source.
    ///
    /// # Returns
    /// - `Ok(ReadExecution)` with the totals also reported to `on_complete`
    /// - `Err(BatchError::ItemReader(_))` if the file cannot be opened or parsed
    /// - any error returned by the transform or the sink
    pub fn read(&self) -> Result<ReadExecution, BatchError> {
        debug!("Opening CSV source {}", self.path.display());

        let file = File::open(&self.path)
            .map_err(|error| BatchError::ItemReader(error.to_string()))?;
        let mut source = BufReader::new(file);
        skip_lines(&mut source, self.options.skip, self.dialect.line_end())?;

        let rows = self
            .dialect
            .reader_builder()
            .from_reader(source)
            .into_records()
            .map(|result| result.map_err(|error| BatchError::ItemReader(error.to_string())));

        stream_rows(
            rows,
            self.options.batch_size,
            self.transform.as_ref(),
            self.sink,
        )
    }
}

/// Discards `count` physical lines, blank ones included, before any CSV parsing.
fn skip_lines<R: BufRead>(source: &mut R, count: usize, line_end: u8) -> Result<(), BatchError> {
    let mut line = Vec::new();
    for skipped in 0..count {
        line.clear();
        let read = source
            .read_until(line_end, &mut line)
            .map_err(|error| BatchError::ItemReader(error.to_string()))?;
        if read == 0 {
            debug!("Source ended after {} skipped lines", skipped);
            break;
        }
    }
    Ok(())
}

/// Builds a transform deserializing each row into `T`, matching fields by header name.
///
/// Rows that do not deserialize abort the read with `BatchError::Transform`.
///
/// # Examples
///
/// ```no_run
/// use serde::Deserialize;
/// use tabular_batch_rs::core::item::{BatchSink, BatchSinkResult};
/// use tabular_batch_rs::item::csv::csv_reader::{deserialize, CsvItemReaderBuilder};
///
/// #[derive(Debug, Deserialize)]
/// struct Car {
///     year: u16,
///     make: String,
/// }
///
/// struct Print;
///
/// impl BatchSink<Car> for Print {
///     fn on_batch(&self, batch: &[Car]) -> BatchSinkResult {
///         println!("{:?}", batch);
///         Ok(())
///     }
/// }
///
/// let sink = Print;
/// let reader = CsvItemReaderBuilder::new()
///     .source("cars.csv")
///     .transform(deserialize::<Car>())
///     .sink(&sink)
///     .build()
///     .unwrap();
/// reader.read().unwrap();
/// ```
pub fn deserialize<T: DeserializeOwned>()
-> impl Fn(&StringRecord, &StringRecord, Option<&T>) -> RowTransformResult<T> {
    |header: &StringRecord, row: &StringRecord, _previous: Option<&T>| -> RowTransformResult<T> {
        row.deserialize(Some(header))
            .map(Some)
            .map_err(|error| BatchError::Transform(error.to_string()))
    }
}

/// A builder for configuring a [`CsvItemReader`].
///
/// # Default Configuration
///
/// - Batch size: 1000
/// - Skipped rows: 0
/// - Dialect: [`CsvDialect::default`]
///
/// `source`, `transform` and `sink` have no default and must be set.
pub struct CsvItemReaderBuilder<'a, T> {
    path: Option<PathBuf>,
    dialect: CsvDialect,
    options: ReadOptions,
    transform: Option<Box<dyn RowTransform<StringRecord, T> + 'a>>,
    sink: Option<&'a dyn BatchSink<T>>,
}

impl<T> Default for CsvItemReaderBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> CsvItemReaderBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            path: None,
            dialect: CsvDialect::default(),
            options: ReadOptions::default(),
            transform: None,
            sink: None,
        }
    }

    /// Sets the file to read.
    pub fn source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the closure turning `(header, row, previous)` into a record.
    ///
    /// # Examples
    ///
    /// ```
    /// use csv::StringRecord;
    /// use tabular_batch_rs::item::csv::csv_reader::CsvItemReaderBuilder;
    ///
    /// // Running total of the second column
    /// let builder = CsvItemReaderBuilder::<u64>::new().transform(
    ///     |_: &StringRecord, row: &StringRecord, previous: Option<&u64>| {
    ///         let amount: u64 = row.get(1).unwrap_or("0").parse().unwrap_or(0);
    ///         Ok(Some(previous.copied().unwrap_or(0) + amount))
    ///     },
    /// );
    /// ```
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&StringRecord, &StringRecord, Option<&T>) -> RowTransformResult<T> + 'a,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Sets a transform implemented as a type rather than a closure.
    pub fn transformer<R>(mut self, transformer: R) -> Self
    where
        R: RowTransform<StringRecord, T> + 'a,
    {
        self.transform = Some(Box::new(transformer));
        self
    }

    pub fn sink(mut self, sink: &'a dyn BatchSink<T>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    /// Number of leading physical lines discarded before the header row.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = skip;
        self
    }

    pub fn dialect(mut self, dialect: CsvDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.dialect.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.dialect.quote = quote;
        self
    }

    pub fn escape(mut self, escape: u8) -> Self {
        self.dialect.escape = escape;
        self
    }

    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.dialect.terminator = terminator;
        self
    }

    pub fn trim(mut self, trim: Trim) -> Self {
        self.dialect.trim = trim;
        self
    }

    /// Validates the configuration and builds the reader.
    ///
    /// Nothing is read here: the source is only checked for existence.
    ///
    /// # Errors
    /// `BatchError::InvalidArgument` when the source, transform or sink is
    /// missing, when the source does not exist, when the batch size is zero or
    /// when the dialect is inconsistent.
    pub fn build(self) -> Result<CsvItemReader<'a, T>, BatchError> {
        let path = self
            .path
            .ok_or_else(|| BatchError::InvalidArgument("Source path is required".to_string()))?;
        if !path.exists() {
            return Err(BatchError::InvalidArgument(format!(
                "Source file does not exist: {}",
                path.display()
            )));
        }

        let transform = self
            .transform
            .ok_or_else(|| BatchError::InvalidArgument("Row transform is required".to_string()))?;
        let sink = self
            .sink
            .ok_or_else(|| BatchError::InvalidArgument("Batch sink is required".to_string()))?;

        self.options.validate()?;
        self.dialect.validate()?;

        Ok(CsvItemReader {
            path,
            dialect: self.dialect,
            options: self.options,
            transform,
            sink,
        })
    }
}
