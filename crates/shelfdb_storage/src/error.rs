//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The stored image could not be opened or read.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Location of the image.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The image could not be written.
    #[error("cannot write {path}: {source}")]
    Write {
        /// Location of the image.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No image has been stored yet.
    #[error("no image stored at {0}")]
    Missing(PathBuf),

    /// Another handle holds the exclusive lock on the image.
    #[error("storage locked: {0} is held by another handle")]
    Locked(PathBuf),

    /// An I/O error occurred outside of reading or writing the image.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Creates an open error for `path`.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
