//! CLI error type.

use hobart::ServiceError;
use hobart_data::DataError;
use hobart_events::EventError;
use thiserror::Error;

/// Errors reported by the CLI.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Service error
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Data or cache error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Event input error
    #[error(transparent)]
    Event(#[from] EventError),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input file
    #[error("{file}: {message}")]
    Input {
        /// Input file
        file: String,
        /// What is wrong
        message: String,
    },
}

impl CliError {
    pub(crate) fn input(file: &str, message: impl Into<String>) -> Self {
        Self::Input {
            file: file.to_string(),
            message: message.into(),
        }
    }
}
