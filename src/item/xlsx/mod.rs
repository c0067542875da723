//! Spreadsheet support (`.xlsx`, and every format `calamine` opens for reading).
//!
//! [`XlsxItemReader`](xlsx_reader::XlsxItemReader) streams the rows of one
//! worksheet through the same batching state machine as the CSV reader.
//! [`XlsxItemWriter`](xlsx_writer::XlsxItemWriter) writes records into a single
//! worksheet named [`DEFAULT_SHEET_NAME`], keeping numbers, booleans and dates
//! typed.

use std::ops::Deref;

use calamine::Data;

pub mod xlsx_reader;
pub mod xlsx_writer;

/// Name of the worksheet created by the writer.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Which worksheet a reader consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// Zero-based position in the workbook.
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

/// One worksheet row, indexed from column A.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetRow(Vec<Data>);

impl SheetRow {
    pub fn new(cells: Vec<Data>) -> Self {
        SheetRow(cells)
    }

    pub fn cells(&self) -> &[Data] {
        &self.0
    }

    /// Textual content of a cell; `None` past the end of the row.
    ///
    /// Whole floats render without a fractional part, so a cell holding `42`
    /// reads as `"42"` whichever way the workbook stored it.
    pub fn text(&self, column: usize) -> Option<String> {
        self.0.get(column).map(cell_text)
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|cell| matches!(cell, Data::Empty))
    }
}

impl Deref for SheetRow {
    type Target = [Data];

    fn deref(&self) -> &[Data] {
        &self.0
    }
}

impl From<Vec<Data>> for SheetRow {
    fn from(cells: Vec<Data>) -> Self {
        SheetRow(cells)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => {
            if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                (*value as i64).to_string()
            } else {
                value.to_string()
            }
        }
        Data::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}
