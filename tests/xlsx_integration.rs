#![cfg(feature = "xlsx")]

pub mod common;

use calamine::{Data, Reader, Xlsx, open_workbook};
use tabular_batch_rs::{
    core::item::RowTransformResult,
    error::BatchError,
    item::xlsx::{
        DEFAULT_SHEET_NAME, SheetRow, xlsx_reader::XlsxItemReaderBuilder,
        xlsx_writer::XlsxItemWriterBuilder,
    },
};
use tempfile::TempDir;

use common::{RecordingSink, init_logger, people, person, person_schema};

fn first_cell(_: &SheetRow, row: &SheetRow, _: Option<&String>) -> RowTransformResult<String> {
    Ok(row.text(0))
}

#[test]
fn seven_people_are_written_then_read_in_batches_of_three() -> Result<(), BatchError> {
    init_logger();
    let dir = TempDir::new()?;
    let path = dir.path().join("people.xlsx");
    let schema = person_schema();

    XlsxItemWriterBuilder::new()
        .schema(&schema)
        .headers(["First name", "Last name", "Age"])
        .keys(["firstName", "lastName", "age"])
        .path(&path)
        .build()?
        .write(&people())?;

    let sink = RecordingSink::<String>::default();
    let execution = XlsxItemReaderBuilder::new()
        .source(&path)
        .transform(first_cell)
        .sink(&sink)
        .batch_size(3)
        .build()?
        .read()?;

    assert_eq!(sink.batch_sizes(), vec![3, 3, 1]);
    assert_eq!(*sink.completed.borrow(), Some((7, 3)));
    assert_eq!(execution.total_records, 7);
    assert_eq!(sink.records()[6], "Frances");
    Ok(())
}

#[test]
fn workbook_has_one_typed_sheet() -> Result<(), BatchError> {
    let dir = TempDir::new()?;
    let path = dir.path().join("addresses.xlsx");
    let schema = person_schema();
    let alice = person("Alice", "Martin", 30, &["Paris", "Lyon", "Nantes"]);

    XlsxItemWriterBuilder::new()
        .schema(&schema)
        .headers(["First name", "Age", "City", "Born"])
        .keys(["firstName", "age", "addresses.city", "birthDate"])
        .path(&path)
        .build()?
        .write(&[alice])?;

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec![DEFAULT_SHEET_NAME.to_string()]);

    let range = workbook.worksheet_range(DEFAULT_SHEET_NAME).unwrap();
    let rows: Vec<&[Data]> = range.rows().collect();
    assert_eq!(rows.len(), 4);
    for (row, city) in rows[1..].iter().zip(["Paris", "Lyon", "Nantes"]) {
        assert_eq!(row[0], Data::String("Alice".to_string()));
        assert_eq!(row[1], Data::Float(30.0));
        assert_eq!(row[2], Data::String(city.to_string()));
        assert!(matches!(row[3], Data::DateTime(_)));
    }
    Ok(())
}

#[test]
fn rows_read_back_through_the_previous_record() -> Result<(), BatchError> {
    let dir = TempDir::new()?;
    let path = dir.path().join("ages.xlsx");
    let schema = person_schema();

    XlsxItemWriterBuilder::new()
        .schema(&schema)
        .headers(["First name", "Age"])
        .keys(["firstName", "age"])
        .path(&path)
        .build()?
        .write(&people())?;

    // Keeps the oldest person seen so far
    let sink = RecordingSink::<(String, f64)>::default();
    XlsxItemReaderBuilder::new()
        .source(&path)
        .sheet_name(DEFAULT_SHEET_NAME)
        .transform(
            |_: &SheetRow, row: &SheetRow, previous: Option<&(String, f64)>| -> RowTransformResult<(String, f64)> {
                let age = match row.get(1) {
                    Some(Data::Float(age)) => *age,
                    _ => return Err(BatchError::Transform("Age is not a number".to_string())),
                };
                match previous {
                    Some(oldest) if oldest.1 >= age => Ok(Some(oldest.clone())),
                    _ => Ok(row.text(0).map(|name| (name, age))),
                }
            },
        )
        .sink(&sink)
        .batch_size(2)
        .build()?
        .read()?;

    let oldest: Vec<String> = sink.records().into_iter().map(|(name, _)| name).collect();
    assert_eq!(
        oldest,
        vec!["Ada", "Grace", "Grace", "Grace", "Grace", "Donald", "Frances"]
    );
    Ok(())
}

#[test]
fn workbook_bytes_can_be_read_in_memory() -> Result<(), BatchError> {
    let schema = person_schema();
    let bytes = XlsxItemWriterBuilder::new()
        .schema(&schema)
        .has_headers(false)
        .keys(["fullName"])
        .build()?
        .write_to_buffer(&[person("Grace", "Hopper", 85, &[])])?;

    let mut workbook = Xlsx::new(std::io::Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range(DEFAULT_SHEET_NAME).unwrap();
    assert_eq!(
        range.get((0, 0)),
        Some(&Data::String("Grace Hopper".to_string()))
    );
    Ok(())
}
