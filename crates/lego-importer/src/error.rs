//! Error types for the catalog import pipeline
//!
//! Row-level errors (`ParseError`, `TransformError`, `WriteError`) are values
//! that get counted and sampled; they never abort a table. `ImportError`
//! covers table- and run-level conditions.

use std::path::PathBuf;
use thiserror::Error;

/// A source line that could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Data line has a different field count than the header
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount { line: u64, expected: usize, found: usize },

    /// Line is not valid delimited text (bad quoting, invalid UTF-8)
    #[error("line {line}: {message}")]
    Malformed { line: u64, message: String },

    /// The underlying stream failed (I/O, corrupt gzip); no further records follow
    #[error("read failed: {message}")]
    Read { message: String },
}

/// A record that could not be mapped onto a table's columns
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("key column '{column}' has invalid value '{value}'")]
    InvalidKey { column: String, value: String },

    #[error("required field '{field}' is missing")]
    MissingField { field: String },

    #[error("{table}: transform produced {found} values for {expected} columns")]
    ColumnCount {
        table: String,
        expected: usize,
        found: usize,
    },
}

/// A single row rejected by the data store (constraint violation, bad value)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{table} [{key}]: {message}")]
pub struct WriteError {
    pub table: String,
    pub key: String,
    pub message: String,
}

/// Table- and run-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Expected input file is missing; the table reports zero rows
    #[error("source file absent: {}", .0.display())]
    SourceAbsent(PathBuf),

    /// Input file exists but cannot be opened or has no usable header
    #[error("source file unreadable: {}: {message}", .path.display())]
    SourceUnreadable { path: PathBuf, message: String },

    /// Data store unreachable or credentials rejected; aborts the run
    #[error("data store connectivity failure: {0}")]
    Connectivity(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// An audit entry could not be written
    #[error("audit write failed: {0}")]
    Audit(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),
}
