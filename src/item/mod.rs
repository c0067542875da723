#[cfg(feature = "logger")]
/// This module provides a sink logging every record it receives.
pub mod logger;

#[cfg(feature = "csv")]
/// This module provides a batched CSV reader and a CSV writer for nested records.
pub mod csv;

#[cfg(feature = "xlsx")]
/// This module provides a batched worksheet reader and an XLSX writer for nested records.
pub mod xlsx;
