//! CSV support for batched reading and nested-record writing.
//!
//! # Module Architecture
//!
//! 1. **CsvItemReader**: streams the records of a delimited file, hands every
//!    data row to a caller transform together with the header row and the
//!    previously emitted record, and delivers the results to a `BatchSink` in
//!    fixed-size batches.
//!
//! 2. **CsvItemWriter**: writes a slice of records through a `Schema`, one
//!    column per key path, fanning records out to several rows when a key path
//!    goes through a collection.
//!
//! Both components are configured with a builder whose `build()` validates the
//! whole configuration before any file is touched. Both share a [`CsvDialect`].
//!
//! # Examples
//!
//! ```
//! use std::cell::RefCell;
//! use std::env::temp_dir;
//!
//! use csv::StringRecord;
//! use tabular_batch_rs::core::item::{BatchSink, BatchSinkResult};
//! use tabular_batch_rs::core::schema::Schema;
//! use tabular_batch_rs::item::csv::csv_reader::CsvItemReaderBuilder;
//! use tabular_batch_rs::item::csv::csv_writer::CsvItemWriterBuilder;
//!
//! struct City {
//!     name: String,
//!     pop: u32,
//! }
//!
//! #[derive(Default)]
//! struct Names(RefCell<Vec<String>>);
//!
//! impl BatchSink<String> for Names {
//!     fn on_batch(&self, batch: &[String]) -> BatchSinkResult {
//!         self.0.borrow_mut().extend_from_slice(batch);
//!         Ok(())
//!     }
//! }
//!
//! let schema = Schema::<City>::builder()
//!     .field("name", |c| c.name.clone())
//!     .field("pop", |c| c.pop)
//!     .build()
//!     .unwrap();
//!
//! let path = temp_dir().join("tabular_batch_rs_cities.csv");
//! let writer = CsvItemWriterBuilder::new()
//!     .schema(&schema)
//!     .headers(["City", "Population"])
//!     .keys(["name", "pop"])
//!     .path(&path)
//!     .build()
//!     .unwrap();
//! writer
//!     .write(&[
//!         City { name: "Boston".to_string(), pop: 4628910 },
//!         City { name: "Concord".to_string(), pop: 42695 },
//!     ])
//!     .unwrap();
//!
//! let names = Names::default();
//! let reader = CsvItemReaderBuilder::new()
//!     .source(&path)
//!     .transform(|_: &StringRecord, row: &StringRecord, _: Option<&String>| {
//!         Ok(row.get(0).map(str::to_string))
//!     })
//!     .sink(&names)
//!     .batch_size(10)
//!     .build()
//!     .unwrap();
//! let execution = reader.read().unwrap();
//!
//! assert_eq!(execution.total_records, 2);
//! assert_eq!(*names.0.borrow(), vec!["Boston", "Concord"]);
//! # std::fs::remove_file(&path).ok();
//! ```

use csv::{ReaderBuilder, Terminator, Trim, WriterBuilder};

use crate::error::BatchError;

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;

/// A module providing facilities for writing CSV data records.
pub mod csv_writer;

/// Syntax of a delimited file.
///
/// # Default Configuration
///
/// - Delimiter: comma (`,`)
/// - Quote: double quote (`"`)
/// - Escape: double quote (`"`), i.e. quotes are escaped by doubling them
/// - Terminator: `\n` (when reading, `\r\n` is accepted as well)
/// - Trimming: none
#[derive(Debug, Clone, Copy)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: u8,
    pub terminator: Terminator,
    pub trim: Trim,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: b'"',
            terminator: Terminator::Any(b'\n'),
            trim: Trim::None,
        }
    }
}

impl CsvDialect {
    /// Rejects dialects the CSV parser cannot tell apart.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.delimiter == self.quote {
            return Err(BatchError::InvalidArgument(format!(
                "Delimiter and quote must differ, both are '{}'",
                self.delimiter.escape_ascii()
            )));
        }
        for (name, byte) in [("Delimiter", self.delimiter), ("Quote", self.quote)] {
            if byte == b'\n' || byte == b'\r' {
                return Err(BatchError::InvalidArgument(format!(
                    "{} must not be a line break",
                    name
                )));
            }
        }
        if let Terminator::Any(byte) = self.terminator {
            if byte == self.delimiter || byte == self.quote {
                return Err(BatchError::InvalidArgument(format!(
                    "Terminator '{}' clashes with the delimiter or the quote",
                    byte.escape_ascii()
                )));
            }
        }
        Ok(())
    }

    /// Byte ending a physical line. `\r\n` ends with `\n` too.
    pub(crate) fn line_end(&self) -> u8 {
        match self.terminator {
            Terminator::Any(byte) => byte,
            _ => b'\n',
        }
    }

    /// Reader configured for this dialect. Headers are handled by the batch
    /// reader itself, so the parser treats every record as data.
    pub(crate) fn reader_builder(&self) -> ReaderBuilder {
        let terminator = match self.terminator {
            Terminator::Any(b'\n') => Terminator::CRLF,
            other => other,
        };

        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .terminator(terminator)
            .trim(self.trim)
            .has_headers(false)
            .flexible(true);

        if self.escape == self.quote {
            builder.double_quote(true).escape(None);
        } else {
            builder.double_quote(false).escape(Some(self.escape));
        }
        builder
    }

    pub(crate) fn writer_builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .terminator(self.terminator)
            .has_headers(false)
            .flexible(false);

        if self.escape == self.quote {
            builder.double_quote(true);
        } else {
            builder.double_quote(false).escape(self.escape);
        }
        builder
    }
}
