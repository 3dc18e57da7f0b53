//! Error types for the signal services.

use hobart_data::DataError;
use hobart_events::EventError;
use hobart_regression::RegressionError;
use thiserror::Error;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A caller-supplied argument is not acceptable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An optional collaborator needed by the operation was not supplied
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Data, market-data or cache error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Regression error
    #[error(transparent)]
    Regression(#[from] RegressionError),

    /// Event-study error
    #[error(transparent)]
    Event(#[from] EventError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
