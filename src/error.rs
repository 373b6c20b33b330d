//! Error types for sql-runner.
//!
//! Every failure is fatal: errors propagate to `main`, which logs the
//! category and message and exits non-zero.

use thiserror::Error;

/// Main error type for sql-runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Configuration errors (invalid settings file, bad option values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (query file unreadable, stdout closed, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Data source errors (table unreachable, directory missing or malformed, etc.)
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Query execution errors (invalid SQL, evaluation failures, etc.)
    #[error("Execution error: {0}")]
    Execution(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunnerError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates a data source error with the given message.
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Io(_) => "I/O Error",
            Self::DataSource(_) => "Data Source Error",
            Self::Execution(_) => "Execution Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using RunnerError.
pub type Result<T> = std::result::Result<T, RunnerError>;
