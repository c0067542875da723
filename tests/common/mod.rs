#![allow(dead_code)]

mod mocks;

use std::cell::RefCell;

use chrono::NaiveDate;
use tabular_batch_rs::core::{
    item::{BatchSink, BatchSinkResult},
    schema::{ColumnDescriptor, Schema},
};

pub use mocks::MockDestination;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub birth_date: Option<NaiveDate>,
    pub addresses: Vec<Address>,
}

pub fn address_schema() -> Schema<Address> {
    Schema::<Address>::builder()
        .field("street", |a| a.street.clone())
        .field("city", |a| a.city.clone())
        .build()
        .unwrap()
}

pub fn person_schema() -> Schema<Person> {
    Schema::<Person>::builder()
        .field("firstName", |p| p.first_name.clone())
        .field("lastName", |p| p.last_name.clone())
        .field("age", |p| p.age)
        .field("birthDate", |p| p.birth_date)
        .field(ColumnDescriptor::new("fullName").rich_text(), |p| {
            format!("{} {}", p.first_name, p.last_name)
        })
        .collection("addresses", |p| p.addresses.as_slice(), address_schema())
        .build()
        .unwrap()
}

pub fn person(first_name: &str, last_name: &str, age: u8, cities: &[&str]) -> Person {
    Person {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        age,
        birth_date: NaiveDate::from_ymd_opt(2024 - i32::from(age), 1, 15),
        addresses: cities
            .iter()
            .enumerate()
            .map(|(number, city)| Address {
                street: format!("{} Main Street", number + 1),
                city: city.to_string(),
            })
            .collect(),
    }
}

/// Seven people, none of them with an address.
pub fn people() -> Vec<Person> {
    [
        ("Ada", "Lovelace", 36),
        ("Grace", "Hopper", 85),
        ("Alan", "Turing", 41),
        ("Edsger", "Dijkstra", 72),
        ("Barbara", "Liskov", 84),
        ("Donald", "Knuth", 86),
        ("Frances", "Allen", 88),
    ]
    .into_iter()
    .map(|(first, last, age)| person(first, last, age, &[]))
    .collect()
}

/// Records every batch and the final totals.
pub struct RecordingSink<T> {
    pub batches: RefCell<Vec<Vec<T>>>,
    pub completed: RefCell<Option<(usize, usize)>>,
}

impl<T> Default for RecordingSink<T> {
    fn default() -> Self {
        Self {
            batches: RefCell::new(Vec::new()),
            completed: RefCell::new(None),
        }
    }
}

impl<T> RecordingSink<T> {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.borrow().iter().map(Vec::len).collect()
    }
}

impl<T: Clone> RecordingSink<T> {
    pub fn records(&self) -> Vec<T> {
        self.batches.borrow().concat()
    }
}

impl<T: Clone> BatchSink<T> for RecordingSink<T> {
    fn on_batch(&self, batch: &[T]) -> BatchSinkResult {
        self.batches.borrow_mut().push(batch.to_vec());
        Ok(())
    }

    fn on_complete(&self, total_records: usize, total_batches: usize) -> BatchSinkResult {
        *self.completed.borrow_mut() = Some((total_records, total_batches));
        Ok(())
    }
}
