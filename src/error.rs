//! Centralized error types for migration-guard
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for analyzer and manifest store operations
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error(
        "Corrupt manifest for target {target} at {}: {message}. Fix or restore the file; it will not be overwritten",
        .path.display()
    )]
    CorruptManifest {
        target: String,
        path: PathBuf,
        message: String,
    },

    #[error(
        "Failed to persist manifest for target {target} at {}: {source}. The previous manifest was left intact",
        .path.display()
    )]
    PersistenceFailure {
        target: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read manifest for target {target} at {}: {source}", .path.display())]
    StorageUnavailable {
        target: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} cancelled for target {target}")]
    Cancelled { operation: String, target: String },

    #[error("{operation} timed out after {after:?} for target {target}")]
    Timeout {
        operation: String,
        target: String,
        after: Duration,
    },

    #[error("Configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

/// Coarse error classification for callers that branch on the failure type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    CorruptManifest,
    PersistenceFailure,
    StorageUnavailable,
    Cancelled,
    Timeout,
    Config,
}

impl GuardError {
    /// Shorthand for building an `InvalidInput` error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::CorruptManifest { .. } => ErrorKind::CorruptManifest,
            Self::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Config { .. } => ErrorKind::Config,
        }
    }
}

pub type Result<T, E = GuardError> = std::result::Result<T, E>;
