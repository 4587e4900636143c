//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

/// An in-memory storage backend.
///
/// This backend keeps the image in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// Clones share the same image, so a test can hand one clone to a database
/// and keep another to inspect or tamper with the stored bytes.
///
/// # Example
///
/// ```rust
/// use shelfdb_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// assert!(!backend.exists().unwrap());
/// backend.write_all(b"image").unwrap();
/// assert_eq!(backend.size().unwrap(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    image: Arc<RwLock<Option<Vec<u8>>>>,
}

impl InMemoryBackend {
    /// Creates a new backend with no stored image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with a pre-existing image.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            image: Arc::new(RwLock::new(Some(data))),
        }
    }

    /// Returns a copy of the stored image, if any.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.image.read().clone()
    }

    /// Replaces the stored image without going through `write_all`.
    pub fn set_data(&self, data: Vec<u8>) {
        *self.image.write() = Some(data);
    }

    /// Forgets the stored image.
    pub fn clear(&self) {
        *self.image.write() = None;
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        self.image
            .read()
            .clone()
            .ok_or_else(|| StorageError::Missing(PathBuf::from(":memory:")))
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        *self.image.write() = Some(data.to_vec());
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn exists(&self) -> StorageResult<bool> {
        Ok(self.image.read().is_some())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.image.read().as_ref().map_or(0, |d| d.len() as u64))
    }

    fn location(&self) -> String {
        ":memory:".to_string()
    }
}
