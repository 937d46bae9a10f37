//! Error types for pstore_core.

use crate::key::Key;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using pstore_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Store root could not be established as a directory.
    #[error("Invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// Storing the value would push disk usage above the quota.
    #[error("Capacity exceeded storing {key}: {requested} bytes requested, {used} of {max} bytes used")]
    CapacityExceeded {
        key: Key,
        requested: u64,
        used: u64,
        max: u64,
    },

    /// No entry stored under the key.
    #[error("Entry not found: {key}")]
    NotFound { key: Key },

    /// Values must contain at least one byte.
    #[error("Empty value for {key}")]
    EmptyValue { key: Key },

    /// Invalid identity format or encoding.
    #[error("Invalid identity: {reason}")]
    InvalidIdentity { reason: String },

    /// Unknown key category name.
    #[error("Invalid category: {name}")]
    InvalidCategory { name: String },
}

impl Error {
    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a CapacityExceeded error.
    pub fn capacity_exceeded(key: Key, requested: u64, used: u64, max: u64) -> Self {
        Error::CapacityExceeded {
            key,
            requested,
            used,
            max,
        }
    }

    /// Create a NotFound error.
    pub fn not_found(key: Key) -> Self {
        Error::NotFound { key }
    }

    /// Create an InvalidIdentity error.
    pub fn invalid_identity(reason: impl Into<String>) -> Self {
        Error::InvalidIdentity {
            reason: reason.into(),
        }
    }

    /// Create an InvalidCategory error.
    pub fn invalid_category(name: impl Into<String>) -> Self {
        Error::InvalidCategory { name: name.into() }
    }

    /// Create an Io error for a store root that is no longer a directory.
    pub fn root_unavailable(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Error::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("store root {} is no longer available", path.display()),
            ),
        }
    }

    /// Returns true for errors raised by the underlying filesystem.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}
