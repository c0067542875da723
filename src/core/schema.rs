//! Export metadata for record types.
//!
//! A [`Schema`] is the table of logical keys a writer can address on a record
//! type. Each key carries a [`ColumnDescriptor`] (formatting hints) and a typed
//! accessor: a scalar getter, a nested record, or a collection of nested
//! records described by their own schema. Schemas are built once and reused
//! for every record and every write.
//!
//! ```
//! use tabular_batch_rs::core::schema::{ColumnDescriptor, Schema};
//!
//! struct Address {
//!     city: String,
//! }
//!
//! struct Person {
//!     first_name: String,
//!     addresses: Vec<Address>,
//! }
//!
//! let address = Schema::<Address>::builder()
//!     .field("city", |a| a.city.clone())
//!     .build()
//!     .unwrap();
//!
//! let person = Schema::<Person>::builder()
//!     .field("firstName", |p| p.first_name.clone())
//!     .field(ColumnDescriptor::new("greeting").formula(), |p| {
//!         format!("CONCAT(\"Hello \", \"{}\")", p.first_name)
//!     })
//!     .collection("addresses", |p| p.addresses.as_slice(), address)
//!     .build()
//!     .unwrap();
//!
//! assert!(person.lookup("greeting").unwrap().is_formula());
//! assert!(person.lookup("lastName").is_none());
//! ```

use std::{collections::HashMap, fmt};

use crate::error::BatchError;

use super::value::CellValue;

/// Key and formatting hints of one schema entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    key: String,
    formula: bool,
    rich_text: bool,
}

impl ColumnDescriptor {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self {
            key: key.into(),
            formula: false,
            rich_text: false,
        }
    }

    /// Spreadsheet output writes the value as a formula expression.
    pub fn formula(mut self) -> Self {
        self.formula = true;
        self
    }

    /// Output writes the value as formatted text.
    pub fn rich_text(mut self) -> Self {
        self.rich_text = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_formula(&self) -> bool {
        self.formula
    }

    pub fn is_rich_text(&self) -> bool {
        self.rich_text
    }
}

impl From<&str> for ColumnDescriptor {
    fn from(key: &str) -> Self {
        ColumnDescriptor::new(key)
    }
}

impl From<String> for ColumnDescriptor {
    fn from(key: String) -> Self {
        ColumnDescriptor::new(key)
    }
}

type ValueGetter<T> = Box<dyn Fn(&T) -> Result<CellValue, String> + Send + Sync>;

enum Accessor<T> {
    Value(ValueGetter<T>),
    Nested(Box<dyn Traverse<T> + Send + Sync>),
}

struct Entry<T> {
    column: ColumnDescriptor,
    accessor: Accessor<T>,
}

/// What a key holds on one particular record.
pub(crate) enum Slot<'a> {
    Value(CellValue, &'a ColumnDescriptor),
    Record(Option<Box<dyn Node<'a> + 'a>>),
    Records(Vec<Box<dyn Node<'a> + 'a>>),
}

/// A record paired with its schema, with the record type erased.
///
/// Slots borrow the record and the schema, not the node, so opened children
/// outlive the node that produced them.
pub(crate) trait Node<'a> {
    /// Looks `key` up and reads it. `Ok(None)` when the key is unknown.
    fn slot(&self, key: &str) -> Result<Option<Slot<'a>>, BatchError>;
}

pub(crate) struct Bound<'a, T> {
    record: &'a T,
    schema: &'a Schema<T>,
}

impl<'a, T> Bound<'a, T> {
    pub(crate) fn new(record: &'a T, schema: &'a Schema<T>) -> Self {
        Self { record, schema }
    }
}

impl<'a, T> Node<'a> for Bound<'a, T> {
    fn slot(&self, key: &str) -> Result<Option<Slot<'a>>, BatchError> {
        let schema: &'a Schema<T> = self.schema;
        let Some(entry) = schema.entry(key) else {
            return Ok(None);
        };

        let slot = match &entry.accessor {
            Accessor::Value(get) => {
                let value = get(self.record).map_err(|message| BatchError::FieldAccess {
                    key: key.to_string(),
                    message,
                })?;
                Slot::Value(value, &entry.column)
            }
            Accessor::Nested(traverse) => traverse.open(self.record),
        };

        Ok(Some(slot))
    }
}

trait Traverse<T> {
    fn open<'a>(&'a self, record: &'a T) -> Slot<'a>;
}

struct NestedRecord<U, F> {
    get: F,
    schema: Schema<U>,
}

impl<T, U, F> Traverse<T> for NestedRecord<U, F>
where
    F: for<'r> Fn(&'r T) -> Option<&'r U>,
{
    fn open<'a>(&'a self, record: &'a T) -> Slot<'a> {
        Slot::Record(
            (self.get)(record)
                .map(|child| Box::new(Bound::new(child, &self.schema)) as Box<dyn Node<'a> + 'a>),
        )
    }
}

struct NestedList<U, F> {
    get: F,
    schema: Schema<U>,
}

impl<T, U, F> Traverse<T> for NestedList<U, F>
where
    F: for<'r> Fn(&'r T) -> &'r [U],
{
    fn open<'a>(&'a self, record: &'a T) -> Slot<'a> {
        Slot::Records(
            (self.get)(record)
                .iter()
                .map(|child| Box::new(Bound::new(child, &self.schema)) as Box<dyn Node<'a> + 'a>)
                .collect(),
        )
    }
}

struct NestedSet<U, F> {
    get: F,
    schema: Schema<U>,
}

impl<T, U, F> Traverse<T> for NestedSet<U, F>
where
    F: for<'r> Fn(&'r T) -> Vec<&'r U>,
{
    fn open<'a>(&'a self, record: &'a T) -> Slot<'a> {
        Slot::Records(
            (self.get)(record)
                .into_iter()
                .map(|child| Box::new(Bound::new(child, &self.schema)) as Box<dyn Node<'a> + 'a>)
                .collect(),
        )
    }
}

/// Typed accessor table of a record type.
pub struct Schema<T> {
    entries: Vec<Entry<T>>,
    index: HashMap<String, usize>,
}

impl<T: 'static> Schema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder::new()
    }
}

impl<T> Schema<T> {
    /// Returns the descriptor registered for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.entry(key).map(|entry| &entry.column)
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.column.key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &str) -> Option<&Entry<T>> {
        self.index.get(key).map(|position| &self.entries[*position])
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.column))
            .finish()
    }
}

/// Registers the keys of a [`Schema`].
///
/// Nested and collection entries take the schema of the element type, so a
/// key path such as `addresses.city` is resolved through the `addresses`
/// entry of this schema and the `city` entry of the address schema.
pub struct SchemaBuilder<T> {
    entries: Vec<Entry<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a scalar value.
    pub fn field<C, V, F>(mut self, column: C, get: F) -> Self
    where
        C: Into<ColumnDescriptor>,
        V: Into<CellValue>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            column: column.into(),
            accessor: Accessor::Value(Box::new(move |record: &T| -> Result<CellValue, String> {
                Ok(get(record).into())
            })),
        });
        self
    }

    /// Registers a scalar value whose getter can fail.
    ///
    /// A failure aborts the write that is reading the value with
    /// [`BatchError::FieldAccess`].
    pub fn try_field<C, V, E, F>(mut self, column: C, get: F) -> Self
    where
        C: Into<ColumnDescriptor>,
        V: Into<CellValue>,
        E: fmt::Display,
        F: Fn(&T) -> Result<V, E> + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            column: column.into(),
            accessor: Accessor::Value(Box::new(move |record: &T| -> Result<CellValue, String> {
                get(record).map(Into::into).map_err(|error| error.to_string())
            })),
        });
        self
    }

    /// Registers an optional nested record.
    pub fn nested<K, U, F>(mut self, key: K, get: F, schema: Schema<U>) -> Self
    where
        K: Into<String>,
        U: 'static,
        F: for<'r> Fn(&'r T) -> Option<&'r U> + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            column: ColumnDescriptor::new(key),
            accessor: Accessor::Nested(Box::new(NestedRecord { get, schema })),
        });
        self
    }

    /// Registers an ordered collection of nested records.
    pub fn collection<K, U, F>(mut self, key: K, get: F, schema: Schema<U>) -> Self
    where
        K: Into<String>,
        U: 'static,
        F: for<'r> Fn(&'r T) -> &'r [U] + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            column: ColumnDescriptor::new(key),
            accessor: Accessor::Nested(Box::new(NestedList { get, schema })),
        });
        self
    }

    /// Registers an unordered collection of nested records, such as a `HashSet`.
    ///
    /// Sub-rows follow whatever order `get` yields the elements in. For hash
    /// based collections that order is unspecified and may change between
    /// runs; register an ordered slice with [`collection`](Self::collection)
    /// when the output order matters.
    pub fn unordered<K, U, F>(mut self, key: K, get: F, schema: Schema<U>) -> Self
    where
        K: Into<String>,
        U: 'static,
        F: for<'r> Fn(&'r T) -> Vec<&'r U> + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            column: ColumnDescriptor::new(key),
            accessor: Accessor::Nested(Box::new(NestedSet { get, schema })),
        });
        self
    }

    /// Indexes the registered keys.
    ///
    /// # Errors
    /// `BatchError::InvalidArgument` when a key is empty, contains a dot, or
    /// is registered twice.
    pub fn build(self) -> Result<Schema<T>, BatchError> {
        let mut index = HashMap::with_capacity(self.entries.len());

        for (position, entry) in self.entries.iter().enumerate() {
            let key = entry.column.key();
            if key.is_empty() {
                return Err(BatchError::InvalidArgument(
                    "Schema keys must not be empty".to_string(),
                ));
            }
            if key.contains('.') {
                return Err(BatchError::InvalidArgument(format!(
                    "Schema key '{}' must not contain '.'",
                    key
                )));
            }
            if index.insert(key.to_string(), position).is_some() {
                return Err(BatchError::InvalidArgument(format!(
                    "Schema key '{}' is registered more than once",
                    key
                )));
            }
        }

        Ok(Schema {
            entries: self.entries,
            index,
        })
    }
}

impl<T: 'static> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
