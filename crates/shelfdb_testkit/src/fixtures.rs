//! Test fixtures and database helpers.
//!
//! Provides a sample record type, convenience functions for setting up test
//! databases and common test scenarios.

use serde::{Deserialize, Serialize};
use shelfdb_core::{Config, Database, Record, RecordMeta};
use shelfdb_storage::InMemoryBackend;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name of the image file inside a file-backed test database's directory.
pub const IMAGE_FILE: &str = "shelf.json";

/// A sample record used throughout the tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toy {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Price in cents.
    pub price: i64,
    /// Whether the toy is soft.
    #[serde(default)]
    pub soft: bool,
}

impl Toy {
    /// Creates a toy that has not been stored yet.
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            meta: RecordMeta::default(),
            name: name.into(),
            price,
            soft: false,
        }
    }

    /// Sets the soft flag.
    #[must_use]
    pub fn soft(mut self, soft: bool) -> Self {
        self.soft = soft;
        self
    }
}

impl Record for Toy {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// In-memory image shared with the database, if memory-backed.
    memory: Option<InMemoryBackend>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        let backend = InMemoryBackend::new();
        let db = Database::open_with_backend(Config::default(), Box::new(backend.clone()))
            .expect("Failed to open in-memory database");
        Self {
            db,
            memory: Some(backend),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test database.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-based test database with custom configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_with_config(&temp_dir.path().join(IMAGE_FILE), config)
            .expect("Failed to open file database");

        Self {
            db,
            memory: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the image path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join(IMAGE_FILE))
    }

    /// Returns the raw stored image.
    pub fn image_bytes(&self) -> Vec<u8> {
        match (&self.memory, self.path()) {
            (Some(memory), _) => memory.data().unwrap_or_default(),
            (None, Some(path)) => std::fs::read(path).unwrap_or_default(),
            (None, None) => Vec::new(),
        }
    }

    /// Overwrites the stored image behind the database's back.
    pub fn corrupt_image(&self, bytes: &[u8]) {
        match (&self.memory, self.path()) {
            (Some(memory), _) => memory.set_data(bytes.to_vec()),
            (None, Some(path)) => std::fs::write(path, bytes).expect("Failed to corrupt image"),
            (None, None) => {}
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust,ignore
/// use shelfdb_testkit::with_temp_db;
///
/// #[test]
/// fn my_test() {
///     with_temp_db(|db| {
///         assert!(db.fetch_collection("toys").unwrap().is_empty());
///     });
/// }
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a database with `count` toys named `toy_0`, `toy_1`, ...
    ///
    /// Prices cycle through 0..10.
    pub fn populated_database(count: usize) -> TestDatabase {
        let test_db = TestDatabase::memory();

        for i in 0..count {
            let mut toy = Toy::new(format!("toy_{}", i), (i % 10) as i64);
            test_db
                .db
                .create("toys", &mut toy)
                .expect("Failed to create toy");
        }

        test_db
    }

    /// Creates a database with one toy in each of `count` collections.
    pub fn multi_collection_database(count: usize) -> (TestDatabase, Vec<String>) {
        let test_db = TestDatabase::memory();
        let mut collections = Vec::with_capacity(count);

        for i in 0..count {
            let name = format!("collection_{}", i);
            let mut toy = Toy::new(format!("toy_{}", i), i as i64);
            test_db
                .db
                .create(&name, &mut toy)
                .expect("Failed to create toy");
            collections.push(name);
        }

        (test_db, collections)
    }

    /// Creates the two-toy database: "Teddy" (id 1) and "Car" (id 2).
    pub fn teddy_and_car() -> TestDatabase {
        let test_db = TestDatabase::memory();
        for (name, price) in [("Teddy", 12), ("Car", 30)] {
            test_db
                .db
                .create("toys", &mut Toy::new(name, price))
                .expect("Failed to create toy");
        }
        test_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_database() {
        let test_db = TestDatabase::memory();
        assert!(test_db.path().is_none());
        assert!(!test_db.image_bytes().is_empty());
    }

    #[test]
    fn test_file_database() {
        let test_db = TestDatabase::file();
        let path = test_db.path().unwrap();
        assert!(path.exists());
        assert_eq!(test_db.db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_with_temp_db() {
        with_temp_db(|db| {
            let toy = db.create("toys", &mut Toy::new("Teddy", 12)).unwrap();
            assert_eq!(toy.id(), "1");
        });
    }

    #[test]
    fn test_with_file_db() {
        with_file_db(|db, path| {
            db.create("toys", &mut Toy::new("Teddy", 12)).unwrap();
            let text = std::fs::read_to_string(path).unwrap();
            assert!(text.contains("Teddy"));
        });
    }

    #[test]
    fn test_populated_scenario() {
        let test_db = scenarios::populated_database(10);
        assert_eq!(test_db.fetch_collection("toys").unwrap().len(), 10);
        assert_eq!(test_db.counter("toys").unwrap(), 10);
    }

    #[test]
    fn test_multi_collection_scenario() {
        let (test_db, names) = scenarios::multi_collection_database(3);
        assert_eq!(test_db.collection_names().unwrap(), names);
    }

    #[test]
    fn test_corrupt_image() {
        let test_db = scenarios::teddy_and_car();
        test_db.corrupt_image(b"garbage");
        assert!(test_db.fetch_collection("toys").unwrap().is_empty());
    }
}
