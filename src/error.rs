//! Error types for the INT8 calibrator

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for calibrator operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the calibrator
///
/// Running out of images is not an error; see
/// [`BatchOutcome::Exhausted`](crate::calibration::BatchOutcome::Exhausted).
#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("Calibration manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Calibration manifest unreadable: {path}: {source}")]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Failed to decode calibration image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Input binding mismatch: calibrator expects '{expected}', engine supplied '{actual}'")]
    BindingMismatch { expected: String, actual: String },

    #[error("Failed to write calibration table {path}: {source}")]
    CacheWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl KolosalError {
    /// Whether the error must abort the calibration run.
    ///
    /// A batch built from bad input would still yield a plausible table,
    /// so these are never retried or skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KolosalError::BindingMismatch { .. }
                | KolosalError::DecodeError { .. }
                | KolosalError::ShapeError { .. }
                | KolosalError::DeviceError(_)
        )
    }

    /// Whether the error was raised by configuration checks at construction.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            KolosalError::ConfigError(_)
                | KolosalError::InvalidParameter { .. }
                | KolosalError::ManifestNotFound { .. }
                | KolosalError::ManifestUnreadable { .. }
        )
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}
