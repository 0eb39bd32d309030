//! Error types for readdirinfo
//!
//! This module defines the error hierarchy for the listing pipeline:
//! - Argument errors, reported synchronously at submission
//! - Enumeration errors, delivered through the completion handler
//! - Worker pool errors
//! - Configuration and CLI errors
//!
//! Per-entry metadata failures are not represented here; they are
//! absorbed by the scanner and recorded as a zero size.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a directory listing
#[derive(Error, Debug)]
pub enum ListError {
    /// Missing or malformed path/handler. Never delivered via the handler.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The directory scan itself failed
    #[error("Failed to read directory '{}': {source}", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background phase died before producing a result
    #[error("Listing of '{}' aborted on worker: {message}", path.display())]
    Aborted { path: PathBuf, message: String },

    /// The completion handler panicked while being invoked
    #[error("Completion handler for request {request} panicked: {message}")]
    DeliveryFault { request: u64, message: String },

    /// Worker pool errors
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}

impl ListError {
    /// Shorthand for an `InvalidArgument` error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        ListError::InvalidArgument(reason.into())
    }

    /// Returns true if this error was raised before any work was scheduled
    pub fn is_synchronous(&self) -> bool {
        matches!(self, ListError::InvalidArgument(_) | ListError::Pool(_))
    }

    /// Returns the OS error kind for enumeration failures
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            ListError::Enumeration { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// The pool no longer accepts jobs
    #[error("Worker pool is shut down")]
    ShutDown,

    /// Worker thread panicked outside of a job
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Worker count override in the environment is not a number
    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// No paths given
    #[error("At least one directory path is required")]
    NoPaths,
}

/// Result type alias for ListError
pub type Result<T> = std::result::Result<T, ListError>;

/// Result type alias for PoolError
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Renders a panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
