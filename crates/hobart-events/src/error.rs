//! Error types for event studies.

use hobart_data::DataError;
use thiserror::Error;

/// Result type for event-study operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors that can occur while building or aggregating event windows.
#[derive(Debug, Error)]
pub enum EventError {
    /// An event carries the wrong number of group labels
    #[error("Group arity mismatch: expected {expected} labels, got {actual}")]
    ArityMismatch {
        /// Number of grouping columns
        expected: usize,
        /// Number of labels supplied
        actual: usize,
    },

    /// A grouping column is not carried by the data
    #[error("Unknown group column: {0}")]
    UnknownGroupColumn(String),

    /// Grouping column names clash with each other or with reserved names
    #[error("Invalid group column: {0}")]
    InvalidGroupColumn(String),

    /// Bucketing input is unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
