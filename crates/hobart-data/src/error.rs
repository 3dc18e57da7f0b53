//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Operation not supported by the target (e.g. writing to the remote cache tier)
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// A row was inserted with the wrong number of values
    #[error("Row arity mismatch: expected {expected} values, got {actual}")]
    ArityMismatch {
        /// Number of columns in the panel
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// The same (date, asset) key was inserted twice
    #[error("Duplicate panel key: {date} / {asset}")]
    DuplicateKey {
        /// Date of the duplicated key
        date: String,
        /// Asset of the duplicated key
        asset: String,
    },

    /// Panels being combined do not share the same columns
    #[error("Column mismatch: expected {expected:?}, got {actual:?}")]
    ColumnMismatch {
        /// Columns of the first panel
        expected: Vec<String>,
        /// Columns of the offending panel
        actual: Vec<String>,
    },

    /// A required column is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Ticker could not be resolved to an asset
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Trading calendar error
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),
}

impl DataError {
    /// The error returned for any write against the read-only remote tier.
    pub fn remote_write() -> Self {
        Self::Unsupported("remote writes unsupported".to_string())
    }
}
