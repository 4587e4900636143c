//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod verify;

use shelfdb_core::Image;
use shelfdb_storage::{FileBackend, StorageBackend, StorageError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format for reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// No image file at the given path.
    #[error("no database found at {0:?}")]
    NotFound(PathBuf),

    /// The image file exists but is not a valid image.
    #[error("image at {path:?} does not decode: {source}")]
    Undecodable {
        /// Image path.
        path: PathBuf,
        /// Decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A `--where` argument without `=`.
    #[error("invalid filter {0:?}: expected FIELD=VALUE")]
    InvalidFilter(String),

    /// A `--where` value that cannot be compared.
    #[error("cannot filter on {0}: only strings, numbers and booleans compare")]
    UnsupportedFilterValue(String),

    /// Verification found errors.
    #[error("verification failed with {0} error(s)")]
    VerificationFailed(usize),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reads the raw image bytes without taking the database lock.
pub fn read_image_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    let backend = FileBackend::open(path)?;
    Ok(backend.read_all()?)
}

/// Reads and decodes the image without healing it.
pub fn read_image(path: &Path) -> Result<(Image, u64), CliError> {
    let bytes = read_image_bytes(path)?;
    let image = Image::decode(&bytes).map_err(|source| CliError::Undecodable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((image, bytes.len() as u64))
}
