use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use csv::{Terminator, Writer};
use log::{debug, info};
use uuid::Uuid;

use crate::{
    core::{
        flatten::{ColumnLayout, RowExpander},
        schema::Schema,
    },
    error::BatchError,
};

use super::CsvDialect;

/// Writes records as delimited text, one column per key path.
///
/// Every cell is written in its textual form. A record whose key paths go
/// through a collection is written as several rows (see
/// [`RowExpander`](crate::core::flatten::RowExpander)).
pub struct CsvItemWriter<'a, T> {
    schema: &'a Schema<T>,
    layout: ColumnLayout,
    dialect: CsvDialect,
    path: Option<PathBuf>,
}

impl<T> CsvItemWriter<'_, T> {
    /// Writes `records` to the configured destination, replacing its content.
    ///
    /// An empty slice leaves the destination untouched.
    pub fn write(&self, records: &[T]) -> Result<(), BatchError> {
        let path = self.path.as_ref().ok_or_else(|| {
            BatchError::InvalidArgument("Destination path is required".to_string())
        })?;

        if records.is_empty() {
            debug!("No record to write, {} left untouched", path.display());
            return Ok(());
        }

        let file = File::create(path)?;
        self.write_to(records, BufWriter::new(file))
    }

    /// Writes `records` into any `io::Write`, e.g. an in-memory buffer.
    pub fn write_to<W: Write>(&self, records: &[T], destination: W) -> Result<(), BatchError> {
        if records.is_empty() {
            return Ok(());
        }

        let id = Uuid::new_v4();
        info!("Start of CSV write: {}, records: {}", id, records.len());

        let mut writer = self.dialect.writer_builder().from_writer(destination);
        let mut rows = 0;

        if let Some(headers) = self.layout.headers() {
            write_row(&mut writer, headers.iter().map(String::as_str))?;
            rows += 1;
        }

        let expander = RowExpander::new(self.schema, &self.layout);
        for record in records {
            for row in expander.expand(record)? {
                let fields: Vec<String> = row.iter().map(|cell| cell.value.to_string()).collect();
                write_row(&mut writer, fields.iter().map(String::as_str))?;
                rows += 1;
            }
        }

        writer
            .flush()
            .map_err(|error| BatchError::ItemWriter(error.to_string()))?;

        info!("End of CSV write: {}, rows: {}", id, rows);
        Ok(())
    }
}

fn write_row<'f, W: Write>(
    writer: &mut Writer<W>,
    fields: impl Iterator<Item = &'f str>,
) -> Result<(), BatchError> {
    writer
        .write_record(fields)
        .map_err(|error| BatchError::ItemWriter(error.to_string()))
}

/// Builder of [`CsvItemWriter`].
///
/// The header row is enabled by default; `headers` must then list one label
/// per key.
pub struct CsvItemWriterBuilder<'a, T> {
    schema: Option<&'a Schema<T>>,
    headers: Vec<String>,
    keys: Vec<String>,
    has_headers: bool,
    dialect: CsvDialect,
    path: Option<PathBuf>,
}

impl<T> Default for CsvItemWriterBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> CsvItemWriterBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            schema: None,
            headers: Vec::new(),
            keys: Vec::new(),
            has_headers: true,
            dialect: CsvDialect::default(),
            path: None,
        }
    }

    pub fn schema(mut self, schema: &'a Schema<T>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Key paths, one per column, e.g. `"name"` or `"addresses.city"`.
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
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

    pub fn build(self) -> Result<CsvItemWriter<'a, T>, BatchError> {
        let schema = self
            .schema
            .ok_or_else(|| BatchError::InvalidArgument("Schema is required".to_string()))?;
        self.dialect.validate()?;
        let layout = ColumnLayout::new(self.headers, self.keys, self.has_headers)?;

        Ok(CsvItemWriter {
            schema,
            layout,
            dialect: self.dialect,
            path: self.path,
        })
    }
}
