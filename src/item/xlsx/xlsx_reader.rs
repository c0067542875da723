use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, open_workbook_auto};
use log::debug;

use crate::{
    core::{
        batch::{ReadOptions, stream_rows},
        item::{BatchSink, ReadExecution, RowTransform, RowTransformResult},
    },
    error::BatchError,
};

use super::{SheetRow, SheetSelector};

/// A batched worksheet reader.
///
/// Rows are counted from the first row of the sheet, blank or not: `skip(2)`
/// always discards physical rows 1 and 2. The first non-blank row left after
/// skipping is the header row. Fully blank rows are ignored, and every row is
/// padded so that index 0 is column A.
///
/// The workbook is opened and the sheet selected when [`read`](Self::read) is
/// called; a missing sheet is reported before any row reaches the transform.
pub struct XlsxItemReader<'a, T> {
    path: PathBuf,
    sheet: SheetSelector,
    options: ReadOptions,
    transform: Box<dyn RowTransform<SheetRow, T> + 'a>,
    sink: &'a dyn BatchSink<T>,
}

impl<T> XlsxItemReader<'_, T> {
    pub fn read(&self) -> Result<ReadExecution, BatchError> {
        let range = self.open_range()?;

        let (first_row, first_column) = range
            .start()
            .map(|(row, column)| (row as usize, column as usize))
            .unwrap_or_default();
        let skip = self.options.skip;

        let rows = range
            .rows()
            .enumerate()
            .filter(|(offset, _)| first_row + offset >= skip)
            .map(|(_, cells)| {
                let mut padded = vec![Data::Empty; first_column];
                padded.extend_from_slice(cells);
                SheetRow::new(padded)
            })
            .filter(|row| !row.is_blank())
            .map(Ok);

        stream_rows(
            rows,
            self.options.batch_size,
            self.transform.as_ref(),
            self.sink,
        )
    }

    fn open_range(&self) -> Result<Range<Data>, BatchError> {
        debug!("Opening workbook {}", self.path.display());

        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|error| BatchError::ItemReader(error.to_string()))?;
        let sheet_names = workbook.sheet_names();

        let name = match &self.sheet {
            SheetSelector::Name(name) => {
                if !sheet_names.contains(name) {
                    return Err(BatchError::InvalidArgument(format!(
                        "Sheet '{}' not found, available sheets: {:?}",
                        name, sheet_names
                    )));
                }
                name.clone()
            }
            SheetSelector::Index(index) => sheet_names.get(*index).cloned().ok_or_else(|| {
                BatchError::InvalidArgument(format!(
                    "Sheet index {} out of range, the workbook has {} sheet(s)",
                    index,
                    sheet_names.len()
                ))
            })?,
        };

        debug!("Reading sheet '{}'", name);
        workbook
            .worksheet_range(&name)
            .map_err(|error| BatchError::ItemReader(error.to_string()))
    }
}

/// Builder of [`XlsxItemReader`].
///
/// Reads the first sheet unless told otherwise. When both `sheet_index` and
/// `sheet_name` are set, the name wins.
pub struct XlsxItemReaderBuilder<'a, T> {
    path: Option<PathBuf>,
    sheet_index: usize,
    sheet_name: Option<String>,
    options: ReadOptions,
    transform: Option<Box<dyn RowTransform<SheetRow, T> + 'a>>,
    sink: Option<&'a dyn BatchSink<T>>,
}

impl<T> Default for XlsxItemReaderBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> XlsxItemReaderBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            path: None,
            sheet_index: 0,
            sheet_name: None,
            options: ReadOptions::default(),
            transform: None,
            sink: None,
        }
    }

    pub fn source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn sheet_index(mut self, index: usize) -> Self {
        self.sheet_index = index;
        self
    }

    pub fn sheet_name<S: Into<String>>(mut self, name: S) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&SheetRow, &SheetRow, Option<&T>) -> RowTransformResult<T> + 'a,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn transformer<R>(mut self, transformer: R) -> Self
    where
        R: RowTransform<SheetRow, T> + 'a,
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

    /// Number of physical rows discarded from the top of the sheet.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = skip;
        self
    }

    pub fn build(self) -> Result<XlsxItemReader<'a, T>, BatchError> {
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

        let sheet = match self.sheet_name {
            Some(name) => SheetSelector::Name(name),
            None => SheetSelector::Index(self.sheet_index),
        };

        Ok(XlsxItemReader {
            path,
            sheet,
            options: self.options,
            transform,
            sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, path::PathBuf};

    use rust_xlsxwriter::{Workbook, XlsxError};
    use tempfile::TempDir;

    use super::*;
    use crate::core::item::BatchSinkResult;

    #[derive(Default)]
    struct Names {
        batches: RefCell<Vec<Vec<String>>>,
    }

    impl BatchSink<String> for Names {
        fn on_batch(&self, batch: &[String]) -> BatchSinkResult {
            self.batches.borrow_mut().push(batch.to_vec());
            Ok(())
        }
    }

    fn first_cell(_: &SheetRow, row: &SheetRow, _: Option<&String>) -> RowTransformResult<String> {
        Ok(row.text(0))
    }

    /// Two sheets; "People" has a title row, a blank row, then a header at row 3.
    fn workbook(dir: &TempDir) -> Result<PathBuf, XlsxError> {
        let path = dir.path().join("people.xlsx");
        let mut workbook = Workbook::new();

        let summary = workbook.add_worksheet();
        summary.set_name("Summary")?;
        summary.write_string(0, 0, "total")?;
        summary.write_string(1, 0, "3")?;

        let people = workbook.add_worksheet();
        people.set_name("People")?;
        people.write_string(0, 0, "People export")?;
        people.write_string(2, 0, "name")?;
        people.write_string(2, 1, "age")?;
        people.write_string(3, 0, "Ada")?;
        people.write_number(3, 1, 36)?;
        people.write_string(5, 0, "Grace")?;
        people.write_number(5, 1, 45)?;
        people.write_string(6, 0, "Edsger")?;
        people.write_number(6, 1, 72)?;

        workbook.save(&path)?;
        Ok(path)
    }

    #[test]
    fn sheet_is_selected_by_name() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = workbook(&dir)?;
        let names = Names::default();

        let execution = XlsxItemReaderBuilder::new()
            .source(&path)
            .sheet_index(0)
            .sheet_name("People")
            .skip(1)
            .batch_size(2)
            .transform(first_cell)
            .sink(&names)
            .build()?
            .read()?;

        assert_eq!(execution.total_records, 3);
        assert_eq!(execution.total_batches, 2);
        assert_eq!(
            *names.batches.borrow(),
            vec![vec!["Ada", "Grace"], vec!["Edsger"]]
        );
        Ok(())
    }

    #[test]
    fn first_sheet_is_read_by_default() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = workbook(&dir)?;
        let names = Names::default();

        XlsxItemReaderBuilder::new()
            .source(&path)
            .transform(first_cell)
            .sink(&names)
            .build()?
            .read()?;

        assert_eq!(*names.batches.borrow(), vec![vec!["3"]]);
        Ok(())
    }

    #[test]
    fn numbers_keep_their_type() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = workbook(&dir)?;
        let names = Names::default();

        XlsxItemReaderBuilder::new()
            .source(&path)
            .sheet_index(1)
            .skip(2)
            .transform(|header: &SheetRow, row: &SheetRow, _: Option<&String>| {
                assert_eq!(header.text(1).as_deref(), Some("age"));
                Ok(match row.get(1) {
                    Some(Data::Float(age)) if *age > 40.0 => row.text(0),
                    _ => None,
                })
            })
            .sink(&names)
            .build()?
            .read()?;

        assert_eq!(*names.batches.borrow(), vec![vec!["Grace", "Edsger"]]);
        Ok(())
    }

    #[test]
    fn missing_sheets_are_invalid_arguments() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = workbook(&dir)?;
        let names = Names::default();

        let by_index = XlsxItemReaderBuilder::new()
            .source(&path)
            .sheet_index(2)
            .transform(first_cell)
            .sink(&names)
            .build()?;
        assert!(matches!(by_index.read(), Err(BatchError::InvalidArgument(_))));

        let by_name = XlsxItemReaderBuilder::new()
            .source(&path)
            .sheet_name("Orders")
            .transform(first_cell)
            .sink(&names)
            .build()?;
        assert!(matches!(by_name.read(), Err(BatchError::InvalidArgument(_))));

        assert!(names.batches.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn unreadable_workbook_is_a_reader_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, "not a zip archive")?;
        let names = Names::default();

        let reader = XlsxItemReaderBuilder::new()
            .source(&path)
            .transform(first_cell)
            .sink(&names)
            .build()?;
        assert!(matches!(reader.read(), Err(BatchError::ItemReader(_))));
        Ok(())
    }
}
