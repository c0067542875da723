//! Turns records into output rows.
//!
//! Each writer column is addressed by a [`KeyPath`]. A record produces one row,
//! or several sub-rows when a key path walks through a collection: the record
//! then fans out to as many rows as its largest addressed collection, and the
//! columns that do not go through a collection repeat their value on every
//! sub-row.

use log::debug;

use crate::error::BatchError;

use super::{
    schema::{Bound, Node, Schema, Slot},
    value::CellValue,
};

/// Dot-separated address of a value, such as `firstName` or `addresses.city`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    raw: String,
    segments: Vec<String>,
}

impl KeyPath {
    pub fn parse(raw: &str) -> Result<Self, BatchError> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(BatchError::InvalidArgument(format!(
                "Key path '{}' contains an empty segment",
                raw
            )));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

/// Validated header labels and key paths of a writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    headers: Option<Vec<String>>,
    paths: Vec<KeyPath>,
}

impl ColumnLayout {
    /// Checks the header/key configuration of a writer.
    ///
    /// # Errors
    /// `BatchError::InvalidArgument` when no key is given, or when the header
    /// row is enabled and the headers are missing or do not match the keys
    /// one to one.
    pub fn new(
        headers: Vec<String>,
        keys: Vec<String>,
        has_headers: bool,
    ) -> Result<Self, BatchError> {
        if has_headers {
            if headers.is_empty() {
                return Err(BatchError::InvalidArgument(
                    "Headers are required when the header row is enabled".to_string(),
                ));
            }
            if headers.len() != keys.len() {
                return Err(BatchError::InvalidArgument(format!(
                    "Header count ({}) does not match key count ({})",
                    headers.len(),
                    keys.len()
                )));
            }
        }
        if keys.is_empty() {
            return Err(BatchError::InvalidArgument(
                "At least one key is required".to_string(),
            ));
        }

        let paths = keys
            .iter()
            .map(|key| KeyPath::parse(key))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            headers: has_headers.then_some(headers),
            paths,
        })
    }

    /// Header labels, when the header row is enabled.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    pub fn paths(&self) -> &[KeyPath] {
        &self.paths
    }

    pub fn width(&self) -> usize {
        self.paths.len()
    }
}

/// Content of one output cell together with the hints of the column it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedCell {
    pub value: CellValue,
    pub formula: bool,
    pub rich_text: bool,
}

/// Expands records of one type into rows of [`ResolvedCell`]s.
pub struct RowExpander<'s, T> {
    schema: &'s Schema<T>,
    layout: &'s ColumnLayout,
}

impl<'s, T> RowExpander<'s, T> {
    pub fn new(schema: &'s Schema<T>, layout: &'s ColumnLayout) -> Self {
        Self { schema, layout }
    }

    /// Returns the rows of `record`, one per sub-row, each as wide as the layout.
    ///
    /// Every collection on a column's path is read once per record, whatever
    /// the number of sub-rows.
    ///
    /// # Errors
    /// Only getter failures surface (`BatchError::FieldAccess`); unknown keys
    /// and absent values produce empty cells.
    pub fn expand(&self, record: &T) -> Result<Vec<Vec<ResolvedCell>>, BatchError> {
        let root = Bound::new(record, self.schema);

        let columns = self
            .layout
            .paths()
            .iter()
            .map(|path| match open_collection(&root, path.segments())? {
                Some(opened) => Ok(Column::FannedOut(opened)),
                None => resolve(&root, path.segments(), 0).map(Column::Fixed),
            })
            .collect::<Result<Vec<_>, BatchError>>()?;

        let sub_rows = columns
            .iter()
            .filter_map(|column| match column {
                Column::FannedOut(opened) => Some(opened.children.len()),
                Column::Fixed(_) => None,
            })
            .max()
            .unwrap_or(0)
            .max(1);
        if sub_rows > 1 {
            debug!("Record fans out to {} rows", sub_rows);
        }

        (0..sub_rows)
            .map(|sub_row| {
                columns
                    .iter()
                    .map(|column| column.cell(sub_row))
                    .collect::<Result<Vec<_>, BatchError>>()
            })
            .collect()
    }
}

/// One column of a record being expanded.
enum Column<'a, 'p> {
    /// Same value on every sub-row.
    Fixed(ResolvedCell),
    FannedOut(OpenedCollection<'a, 'p>),
}

impl Column<'_, '_> {
    fn cell(&self, sub_row: usize) -> Result<ResolvedCell, BatchError> {
        match self {
            Column::Fixed(cell) => Ok(cell.clone()),
            Column::FannedOut(opened) => match opened.children.get(sub_row) {
                Some(child) => resolve(child.as_ref(), opened.rest, sub_row),
                None => Ok(ResolvedCell::default()),
            },
        }
    }
}

/// Elements of the first collection met on a path, with the segments left to
/// read on each element.
struct OpenedCollection<'a, 'p> {
    children: Vec<Box<dyn Node<'a> + 'a>>,
    rest: &'p [String],
}

/// Opens the first collection met on the intermediate segments of a path.
fn open_collection<'a, 'p>(
    node: &dyn Node<'a>,
    segments: &'p [String],
) -> Result<Option<OpenedCollection<'a, 'p>>, BatchError> {
    let [head, rest @ ..] = segments else {
        return Ok(None);
    };
    if rest.is_empty() {
        return Ok(None);
    }

    match node.slot(head)? {
        Some(Slot::Record(Some(child))) => open_collection(child.as_ref(), rest),
        Some(Slot::Records(children)) => Ok(Some(OpenedCollection { children, rest })),
        _ => Ok(None),
    }
}

/// Reads the value at `segments`, picking element `sub_row` of every collection on the way.
fn resolve<'a>(
    node: &dyn Node<'a>,
    segments: &[String],
    sub_row: usize,
) -> Result<ResolvedCell, BatchError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(ResolvedCell::default());
    };

    let cell = match node.slot(head)? {
        Some(Slot::Value(value, column)) if rest.is_empty() => ResolvedCell {
            value,
            formula: column.is_formula(),
            rich_text: column.is_rich_text(),
        },
        Some(Slot::Record(Some(child))) if !rest.is_empty() => {
            resolve(child.as_ref(), rest, sub_row)?
        }
        Some(Slot::Records(children)) if !rest.is_empty() => {
            match children.into_iter().nth(sub_row) {
                Some(child) => resolve(child.as_ref(), rest, sub_row)?,
                None => ResolvedCell::default(),
            }
        }
        _ => ResolvedCell::default(),
    };

    Ok(cell)
}
