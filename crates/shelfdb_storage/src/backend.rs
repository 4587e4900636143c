//! Storage backend trait definition.

use crate::error::StorageResult;

/// A whole-image storage backend for ShelfDB.
///
/// Backends are **opaque image stores**. A backend holds at most one byte
/// image; reads return all of it and writes replace all of it. ShelfDB owns
/// the interpretation of the bytes.
///
/// # Invariants
///
/// - `read_all` returns exactly the bytes of the last successful `write_all`
/// - `read_all` fails if nothing has been stored (or the store is unreadable)
/// - `write_all` replaces the previous image; it never appends
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the complete stored image.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No image exists yet
    /// - The image cannot be opened (permissions, I/O)
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the stored image with `data`.
    ///
    /// Whether a failed write can leave a partially written image behind
    /// depends on the backend (see [`super::WriteMode`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be written.
    fn write_all(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Syncs the stored image to durable storage.
    ///
    /// After this returns successfully the last written image survives
    /// process termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns whether an image has been stored.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self) -> StorageResult<bool>;

    /// Returns the size of the stored image in bytes (0 if none).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Human-readable location of the image, used in error messages.
    fn location(&self) -> String;
}
