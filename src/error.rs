use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// A builder option or a resource selection is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    /// A row transform refused a row and asked to abort the read.
    #[error("Transform from: {0}")]
    Transform(String),

    /// A schema getter failed while a record was being written.
    #[error("Field access failed for key '{key}': {message}")]
    FieldAccess { key: String, message: String },
}
