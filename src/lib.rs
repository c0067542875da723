#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 <div align="center">
   <h1>Tabular Batch for Rust</h1>
   <h3>Batched CSV and spreadsheet import, nested-record export</h3>
  </div>

 # Tabular Batch for Rust

 A small toolkit for moving records in and out of tabular files. Readers stream
 a delimited file or a worksheet, turn every row into a record through your own
 transform and hand the records to a sink in fixed-size batches. Writers take a
 slice of records, flatten their nested collections into repeated rows and save
 the result as CSV or XLSX.

 ## Core Concepts

- **RowTransform:** turns `(header, row, previous)` into `Some(record)`, or `None` to drop the row.
- **BatchSink:** receives the records batch by batch, then the final totals.
- **Schema:** the typed list of values a record exposes to writers, addressed by key.
  Nested records and collections carry their own schema, so `addresses.city` walks
  from a person to each of their addresses.
- **RowExpander:** turns one record into one or more rows; a record with three
  addresses gives three rows, the other columns repeated in each.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| csv           | Enables the CSV reader and writer (default)                   |
| xlsx          | Enables the worksheet reader and the XLSX writer (default)    |
| logger        | Enables a logging `BatchSink`, useful for debugging purposes  |
| full          | Enables all available features                                |

 ## Getting Started

```toml
[dependencies]
tabular-batch-rs = { version = "<version>", features = ["<full|csv|xlsx|logger>"] }
```

Then, on your main.rs:

```rust
# use std::cell::Cell;
# use std::env::temp_dir;
# use csv::StringRecord;
# use tabular_batch_rs::{
#     core::{
#         item::{BatchSink, BatchSinkResult},
#         schema::Schema,
#     },
#     error::BatchError,
#     item::csv::{csv_reader::CsvItemReaderBuilder, csv_writer::CsvItemWriterBuilder},
# };
struct Person {
    first_name: String,
    addresses: Vec<Address>,
}

struct Address {
    city: String,
}

#[derive(Default)]
struct Counter(Cell<usize>);

impl BatchSink<String> for Counter {
    fn on_batch(&self, batch: &[String]) -> BatchSinkResult {
        self.0.set(self.0.get() + batch.len());
        Ok(())
    }
}

fn main() -> Result<(), BatchError> {
    let address = Schema::<Address>::builder()
        .field("city", |a| a.city.clone())
        .build()?;
    let schema = Schema::<Person>::builder()
        .field("firstName", |p| p.first_name.clone())
        .collection("addresses", |p| p.addresses.as_slice(), address)
        .build()?;

    let alice = Person {
        first_name: "Alice".to_string(),
        addresses: ["Paris", "Lyon", "Nantes"]
            .into_iter()
            .map(|city| Address { city: city.to_string() })
            .collect(),
    };

    let path = temp_dir().join("tabular_batch_rs_people.csv");
    CsvItemWriterBuilder::new()
        .schema(&schema)
        .headers(["First name", "City"])
        .keys(["firstName", "addresses.city"])
        .path(&path)
        .build()?
        .write(&[alice])?;

    let counter = Counter::default();
    let execution = CsvItemReaderBuilder::new()
        .source(&path)
        .transform(|_: &StringRecord, row: &StringRecord, _: Option<&String>| {
            Ok(row.get(1).map(str::to_string))
        })
        .sink(&counter)
        .batch_size(2)
        .build()?
        .read()?;

    assert_eq!(counter.0.get(), 3);
    assert_eq!(execution.total_batches, 2);
    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module: batching, typed cell values, record schemas and row expansion
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Readers and writers per file format
pub mod item;
