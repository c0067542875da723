use std::path::{Path, PathBuf};

use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use uuid::Uuid;

use crate::{
    core::{
        flatten::{ColumnLayout, ResolvedCell, RowExpander},
        schema::Schema,
        value::CellValue,
    },
    error::BatchError,
};

use super::DEFAULT_SHEET_NAME;

const DATE_NUM_FORMAT: &str = "yyyy-mm-dd";
const DATE_TIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const COLUMN_PADDING: usize = 2;

fn writer_error(error: XlsxError) -> BatchError {
    BatchError::ItemWriter(error.to_string())
}

struct Formats {
    date: Format,
    date_time: Format,
    rich_text: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            date: Format::new().set_num_format(DATE_NUM_FORMAT),
            date_time: Format::new().set_num_format(DATE_TIME_NUM_FORMAT),
            rich_text: Format::new().set_text_wrap(),
        }
    }
}

/// Writes records into a single worksheet, one column per key path.
///
/// Numbers, booleans and dates are written as typed cells, formula columns as
/// formulas and everything else as strings. Columns are sized to their widest
/// value.
pub struct XlsxItemWriter<'a, T> {
    schema: &'a Schema<T>,
    layout: ColumnLayout,
    path: Option<PathBuf>,
}

impl<T> XlsxItemWriter<'_, T> {
    /// Saves the workbook to the configured destination.
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

        let mut workbook = self.workbook(records)?;
        workbook.save(path).map_err(writer_error)
    }

    /// Returns the workbook as `.xlsx` bytes, or an empty vector when there is
    /// no record.
    pub fn write_to_buffer(&self, records: &[T]) -> Result<Vec<u8>, BatchError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut workbook = self.workbook(records)?;
        workbook.save_to_buffer().map_err(writer_error)
    }

    fn workbook(&self, records: &[T]) -> Result<Workbook, BatchError> {
        let id = Uuid::new_v4();
        info!("Start of XLSX write: {}, records: {}", id, records.len());

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(DEFAULT_SHEET_NAME).map_err(writer_error)?;

        let formats = Formats::new();
        let mut widths = ColumnWidths::new(self.layout.width());
        let mut row: u32 = 0;

        if let Some(headers) = self.layout.headers() {
            for (column, label) in headers.iter().enumerate() {
                worksheet
                    .write_string(row, column_index(column)?, label)
                    .map_err(writer_error)?;
                widths.measure(column, label);
            }
            row += 1;
        }

        let expander = RowExpander::new(self.schema, &self.layout);
        for record in records {
            for cells in expander.expand(record)? {
                for (column, cell) in cells.iter().enumerate() {
                    write_cell(worksheet, &formats, row, column_index(column)?, cell)?;
                    widths.measure(column, &cell.value.to_string());
                }
                row = row.checked_add(1).ok_or_else(|| {
                    BatchError::ItemWriter("Too many rows for one worksheet".to_string())
                })?;
            }
        }

        for (column, width) in widths.padded().enumerate() {
            worksheet
                .set_column_width(column_index(column)?, width as f64)
                .map_err(writer_error)?;
        }

        info!("End of XLSX write: {}, rows: {}", id, row);
        Ok(workbook)
    }
}

/// Widest rendered value per column, in characters.
#[derive(Debug, Default)]
struct ColumnWidths(Vec<usize>);

impl ColumnWidths {
    fn new(columns: usize) -> Self {
        ColumnWidths(vec![0; columns])
    }

    fn measure(&mut self, column: usize, text: &str) {
        if let Some(width) = self.0.get_mut(column) {
            *width = (*width).max(text.chars().count());
        }
    }

    /// Column widths to apply, padding included.
    fn padded(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().map(|width| width + COLUMN_PADDING)
    }
}

fn column_index(column: usize) -> Result<u16, BatchError> {
    u16::try_from(column)
        .map_err(|_| BatchError::ItemWriter(format!("Column {} is out of range", column)))
}

fn write_cell(
    worksheet: &mut Worksheet,
    formats: &Formats,
    row: u32,
    column: u16,
    cell: &ResolvedCell,
) -> Result<(), BatchError> {
    if cell.value.is_empty() {
        return Ok(());
    }

    if cell.formula {
        let formula = cell.value.to_string();
        worksheet
            .write_formula(row, column, formula.as_str())
            .map_err(writer_error)?;
        return Ok(());
    }

    if cell.rich_text {
        let text = cell.value.to_string();
        worksheet
            .write_string_with_format(row, column, &text, &formats.rich_text)
            .map_err(writer_error)?;
        return Ok(());
    }

    match &cell.value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            worksheet
                .write_string(row, column, text)
                .map_err(writer_error)?;
        }
        CellValue::Int(value) => {
            worksheet
                .write_number(row, column, *value as f64)
                .map_err(writer_error)?;
        }
        CellValue::Float(value) => {
            worksheet
                .write_number(row, column, *value)
                .map_err(writer_error)?;
        }
        CellValue::Bool(value) => {
            worksheet
                .write_boolean(row, column, *value)
                .map_err(writer_error)?;
        }
        CellValue::Date(date) => {
            worksheet
                .write_datetime_with_format(row, column, date, &formats.date)
                .map_err(writer_error)?;
        }
        CellValue::DateTime(datetime) => {
            worksheet
                .write_datetime_with_format(row, column, datetime, &formats.date_time)
                .map_err(writer_error)?;
        }
    }
    Ok(())
}

/// Builder of [`XlsxItemWriter`]. The header row is enabled by default.
pub struct XlsxItemWriterBuilder<'a, T> {
    schema: Option<&'a Schema<T>>,
    headers: Vec<String>,
    keys: Vec<String>,
    has_headers: bool,
    path: Option<PathBuf>,
}

impl<T> Default for XlsxItemWriterBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> XlsxItemWriterBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            schema: None,
            headers: Vec::new(),
            keys: Vec::new(),
            has_headers: true,
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

    pub fn build(self) -> Result<XlsxItemWriter<'a, T>, BatchError> {
        let schema = self
            .schema
            .ok_or_else(|| BatchError::InvalidArgument("Schema is required".to_string()))?;
        let layout = ColumnLayout::new(self.headers, self.keys, self.has_headers)?;

        Ok(XlsxItemWriter {
            schema,
            layout,
            path: self.path,
        })
    }
}
