//! Error types for rolling regressions.

use hobart_data::{Asset, DataError};
use thiserror::Error;

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while fitting regressions.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Too few observations to form a single window
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// The design matrix cannot be inverted
    #[error("Singular design matrix")]
    SingularMatrix,

    /// Inputs contain NaN or infinite values
    #[error("Non-finite input values")]
    NonFinite,

    /// Response and regressors have different lengths
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A fit failed for one asset; fatal for the whole batch
    #[error(
        "Regression failed for {asset} ({observations} observations, {first_date} to {last_date}): {source}"
    )]
    Computation {
        /// Asset being fitted
        asset: Asset,
        /// Aligned observations available for the asset
        observations: usize,
        /// First observed date
        first_date: String,
        /// Last observed date
        last_date: String,
        /// Underlying failure
        #[source]
        source: Box<Self>,
    },

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Worker pool could not be built
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl RegressionError {
    /// Whether the engine may skip the asset and carry on with the batch.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
