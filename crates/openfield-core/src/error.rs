//! Core error types for openfield-core.
//!
//! Every failure here is recoverable: the caller shows it to the observer and
//! the timer state is left exactly as it was before the call.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for openfield-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Trial input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Timer lifecycle errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Report export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected trial input. Raised by `start` before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Animal id is empty or whitespace only
    #[error("animal id is required")]
    MissingAnimalId,

    /// Duration is not a positive whole number of seconds
    #[error("invalid trial duration '{value}': expected a positive whole number of seconds")]
    InvalidDuration { value: String },
}

/// Calls that need a trial which does not exist (yet).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// `stop` on a timer that is not running and has no previous report
    #[error("no trial is running")]
    NotRunning,

    /// `report` before the first `start`
    #[error("no active or completed trial; start a trial first")]
    NoActiveOrCompletedTrial,
}

/// Report export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Destination file could not be created or written
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writer-level IO failure
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Config directory could not be created
    #[error("Failed to prepare config directory {path}: {source}")]
    NoDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
