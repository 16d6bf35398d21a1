//! Pipeline errors: the fatal outcomes of a signal or label run.

use super::error_code::{self, ErrorCode};
use super::{ConfigError, StorageError};

/// Errors that abort a run.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Missing prerequisite data: {message}")]
    MissingData { message: String },

    #[error("Report command `{command}` failed: {message}")]
    Report { command: String, message: String },
}

impl ErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::MissingData { .. } => error_code::MISSING_DATA,
            Self::Report { .. } => error_code::REPORT_FAILED,
        }
    }
}
