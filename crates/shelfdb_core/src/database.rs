//! Database facade.

use crate::collection::Collection;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::filter::{filter_equals, FieldValue};
use crate::image::Image;
use crate::persistence::{load_image, persist_image};
use crate::record::{decode_record, encode_record, stamp_raw_updated, Record};
use crate::stats::{CollectionSummary, DatabaseStats, ImageSummary, StatsSnapshot};
use crate::types::{CollectionVersion, RawRecord};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use shelfdb_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The main database handle.
///
/// `Database` is the entry point to ShelfDB. Every operation loads the whole
/// image from the backend, works on it in memory and, if it mutates
/// anything, writes the whole image back. Nothing is cached between
/// operations.
///
/// # Concurrency
///
/// The handle owns a readers-writer lock around its backend. Each public
/// operation holds it from the image load until the image is persisted (or
/// the operation fails):
///
/// - create, replace and modify take the write lock
/// - fetch and filter take the read lock and may run concurrently
///
/// Share one handle between threads (e.g. behind an `Arc`) rather than
/// opening the same file twice; a file-backed handle takes an exclusive
/// advisory lock and a second open fails with [`CoreError::DatabaseLocked`].
///
/// # Lost updates
///
/// [`Database::replace_collection`] overwrites whatever the collection holds
/// at the time of the call. A caller that fetched, edited and replaced will
/// silently discard changes made by others in between. Use
/// [`Database::modify_collection`] to do the whole cycle under one lock, or
/// [`Database::replace_collection_checked`] to detect the interleaving.
///
/// # Example
///
/// ```rust,ignore
/// use shelfdb_core::Database;
/// use std::path::Path;
///
/// let db = Database::open(Path::new("shelf.json"))?;
/// let mut toy = Toy::new("Teddy");
/// db.create("toys", &mut toy)?;
/// assert_eq!(toy.id(), "1");
///
/// let cars = db.filter_equals("toys", "name", "Car")?;
/// ```
pub struct Database {
    /// Configuration.
    config: Config,
    /// Image file path. None for non-file backends.
    path: Option<PathBuf>,
    /// Backend holding the image, guarded for the span of each operation.
    backend: RwLock<Box<dyn StorageBackend>>,
    /// Operation counters.
    stats: DatabaseStats,
    /// Whether the database is open.
    is_open: RwLock<bool>,
}

impl Database {
    /// Opens (or creates) a database stored in the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another handle holds the image (`DatabaseLocked`)
    /// - The image cannot be created or read (`OpenFailure`, `WriteFailure`)
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database file with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use shelfdb_core::{Config, Database, WriteMode};
    /// use std::path::Path;
    ///
    /// let config = Config::default()
    ///     .write_mode(WriteMode::AtomicReplace)
    ///     .pretty(true);
    ///
    /// let db = Database::open_with_config(Path::new("shelf.json"), config)?;
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let backend = if config.create_if_missing {
            FileBackend::open_with_create_dirs(path)
        } else {
            FileBackend::open(path)
        }
        .map_err(CoreError::OpenFailure)?;
        let mut backend = backend.with_write_mode(config.write_mode);

        // Refuse before the lock file is created next to a missing image.
        if !config.create_if_missing && !backend.exists().map_err(CoreError::OpenFailure)? {
            return Err(CoreError::OpenFailure(StorageError::Missing(
                path.to_path_buf(),
            )));
        }

        if config.exclusive_lock {
            backend.lock_exclusive().map_err(|e| match e {
                StorageError::Locked(_) => CoreError::DatabaseLocked,
                other => CoreError::OpenFailure(other),
            })?;
        }

        let mut db = Self::open_with_backend(config, Box::new(backend))?;
        db.path = Some(path.to_path_buf());
        Ok(db)
    }

    /// Opens a database on a pre-configured backend.
    ///
    /// If the backend holds no image and `create_if_missing` is set, an
    /// empty image is written.
    ///
    /// # Errors
    ///
    /// Returns `OpenFailure` if the backend holds no image and
    /// `create_if_missing` is false, or `WriteFailure` if the empty image
    /// cannot be written.
    pub fn open_with_backend(
        config: Config,
        mut backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let stats = DatabaseStats::new();

        if !backend.exists().map_err(CoreError::OpenFailure)? {
            if !config.create_if_missing {
                return Err(CoreError::OpenFailure(StorageError::Missing(
                    PathBuf::from(backend.location()),
                )));
            }
            debug!(location = %backend.location(), "creating empty image");
            // The initial image is not an operation of the handle.
            persist_image(backend.as_mut(), &mut Image::new(), &config, &DatabaseStats::new())?;
        }

        Ok(Self {
            config,
            path: None,
            backend: RwLock::new(backend),
            stats,
            is_open: RwLock::new(true),
        })
    }

    /// Opens a fresh in-memory database for testing.
    ///
    /// Data is lost when the handle is dropped.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Creates a record in `collection`.
    ///
    /// The collection is created if needed. The record gets the next
    /// identity (`counter + 1`, as a decimal string) and both timestamps set
    /// to now; the caller's value is stamped in place and a copy returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be loaded, the record does not
    /// encode as an object, or the image cannot be persisted. On error the
    /// caller's record metadata is restored and nothing was stored.
    pub fn create<T: Record + Clone>(&self, collection: &str, record: &mut T) -> CoreResult<T> {
        validate_collection_name(collection)?;
        let previous = record.meta().clone();
        let now = Utc::now();

        let result = self.write_txn(|image| {
            image.ensure_collection(collection);
            let sequence = image
                .counter(collection)
                .checked_add(1)
                .ok_or_else(|| CoreError::encode(collection, "sequence counter exhausted"))?;
            record.meta_mut().stamp_created(sequence, now);
            let raw = encode_record(collection, &*record)?;
            image.append(collection, raw, sequence);
            Ok((sequence, true))
        });

        match result {
            Ok(sequence) => {
                self.stats.record_create();
                debug!(collection, id = sequence, "record created");
                Ok(record.clone())
            }
            Err(e) => {
                *record.meta_mut() = previous;
                Err(e)
            }
        }
    }

    /// Returns every record of `collection` in insertion order, untyped.
    ///
    /// An unknown or empty collection yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error only if the image cannot be loaded.
    pub fn fetch_collection(&self, collection: &str) -> CoreResult<Vec<RawRecord>> {
        self.fetch_versioned(collection).map(|(records, _)| records)
    }

    /// Returns every record of `collection` together with its version.
    ///
    /// Pass the version to [`Database::replace_collection_checked`] to detect
    /// changes made between this read and the replace.
    ///
    /// # Errors
    ///
    /// Returns an error only if the image cannot be loaded.
    pub fn fetch_versioned(
        &self,
        collection: &str,
    ) -> CoreResult<(Vec<RawRecord>, CollectionVersion)> {
        validate_collection_name(collection)?;
        self.read_txn(|mut image| {
            image.ensure_collection(collection);
            self.stats.record_fetch();
            let version = image.version(collection);
            Ok((image.take_records(collection), version))
        })
    }

    /// Returns every record of `collection` decoded as `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be loaded or a record does not
    /// decode as `T`.
    pub fn fetch<T: DeserializeOwned>(&self, collection: &str) -> CoreResult<Vec<T>> {
        self.fetch_collection(collection)?
            .into_iter()
            .map(|raw| decode_record(collection, raw))
            .collect()
    }

    /// Returns the records of `collection` whose `field` equals `value`.
    ///
    /// Type mismatches are non-matches (see [`crate::filter`]).
    ///
    /// # Errors
    ///
    /// Returns an error only if the image cannot be loaded.
    pub fn filter_equals(
        &self,
        collection: &str,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> CoreResult<Vec<RawRecord>> {
        let value = value.into();
        let records = self.fetch_collection(collection)?;
        let matched = filter_equals(&records, field, &value);
        debug!(
            collection,
            field,
            value = %value,
            scanned = records.len(),
            matched = matched.len(),
            "equality filter"
        );
        Ok(matched)
    }

    /// Replaces the contents of `collection` with `records`.
    ///
    /// Every record's `updated_at` is set to now; identity and `created_at`
    /// are kept as given, so retained records must carry their original
    /// identity. The sequence counter is not touched. The caller's records
    /// are stamped once the image is persisted.
    ///
    /// This does not check for concurrent changes (see the type docs).
    ///
    /// # Errors
    ///
    /// Returns an error if a record does not encode, or the image cannot be
    /// loaded or persisted.
    pub fn replace_collection<T: Record>(&self, collection: &str, records: &mut [T]) -> CoreResult<()> {
        self.replace_typed(collection, records, None).map(|_| ())
    }

    /// Replaces the contents of `collection` if it is still at `expected`.
    ///
    /// Returns the collection's new version.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] (nothing written) if the collection's
    /// records or counter changed since `expected` was read, plus the errors
    /// of [`Database::replace_collection`].
    pub fn replace_collection_checked<T: Record>(
        &self,
        collection: &str,
        expected: &CollectionVersion,
        records: &mut [T],
    ) -> CoreResult<CollectionVersion> {
        self.replace_typed(collection, records, Some(expected))
    }

    /// Untyped [`Database::replace_collection`].
    ///
    /// Objects get their `updated_at` key set to now; other values are
    /// stored as given.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be loaded or persisted.
    pub fn replace_collection_raw(
        &self,
        collection: &str,
        records: Vec<RawRecord>,
    ) -> CoreResult<CollectionVersion> {
        self.replace_at(collection, records, Utc::now(), None)
    }

    /// Reads, edits and writes `collection` under a single write lock.
    ///
    /// `f` receives the stored records and may reorder, edit, add or drop
    /// them. If the list changed, every record's `updated_at` is set to now
    /// and the image persisted; otherwise nothing is written. No other
    /// operation on this handle can interleave.
    ///
    /// `f` runs while the handle's write lock is held. The lock is not
    /// reentrant: calling back into this `Database` from `f` deadlocks.
    /// Read what the edit needs before calling.
    ///
    /// # Errors
    ///
    /// Returns the closure's error (nothing written), or an error if the
    /// image cannot be loaded or persisted.
    pub fn modify_collection<R, F>(&self, collection: &str, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Vec<RawRecord>) -> CoreResult<R>,
    {
        self.modify_collection_at(collection, Utc::now(), f)
    }

    pub(crate) fn modify_collection_at<R, F>(
        &self,
        collection: &str,
        now: DateTime<Utc>,
        f: F,
    ) -> CoreResult<R>
    where
        F: FnOnce(&mut Vec<RawRecord>) -> CoreResult<R>,
    {
        validate_collection_name(collection)?;
        self.write_txn(|image| {
            image.ensure_collection(collection);
            let mut records = image.take_records(collection);
            let before = records.clone();
            let result = f(&mut records)?;

            let changed = records != before;
            if changed {
                for record in &mut records {
                    stamp_raw_updated(record, now);
                }
                self.stats.record_replace();
                debug!(collection, records = records.len(), "collection modified");
            }
            image.replace(collection, records);
            Ok((result, changed))
        })
    }

    /// Returns a typed handle on `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCollectionName`] for an empty name.
    pub fn collection<T: Record + Clone>(&self, name: &str) -> CoreResult<Collection<'_, T>> {
        validate_collection_name(name)?;
        Ok(Collection::new(self, name.to_string()))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns the names of the stored collections, sorted.
    pub fn collection_names(&self) -> CoreResult<Vec<String>> {
        self.read_txn(|image| Ok(image.collection_names().map(str::to_string).collect()))
    }

    /// Returns the last identity handed out in `collection` (0 if none).
    pub fn counter(&self, collection: &str) -> CoreResult<u64> {
        validate_collection_name(collection)?;
        self.read_txn(|mut image| {
            image.ensure_collection(collection);
            Ok(image.counter(collection))
        })
    }

    /// Describes the stored image.
    pub fn summary(&self) -> CoreResult<ImageSummary> {
        self.read_txn_with_size(|image, image_bytes| {
            let collections = image
                .collection_names()
                .map(|name| CollectionSummary {
                    name: name.to_string(),
                    records: image.records(name).len() as u64,
                    counter: image.counter(name),
                })
                .collect();
            Ok(ImageSummary {
                collections,
                total_records: image.record_count(),
                image_bytes,
            })
        })
    }

    /// Returns the operation counters of this handle.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the image file path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the database. Later operations fail with `DatabaseClosed`.
    ///
    /// Every operation persists before returning, so there is nothing to
    /// flush. The advisory lock is held until the handle is dropped.
    pub fn close(&self) -> CoreResult<()> {
        // Wait for in-flight operations.
        let _backend = self.backend.write();
        *self.is_open.write() = false;
        Ok(())
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Ensures the database is open.
    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::DatabaseClosed)
        }
    }

    /// Runs `f` on a freshly loaded image under the read lock.
    fn read_txn<R, F>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(Image) -> CoreResult<R>,
    {
        self.read_txn_with_size(|image, _| f(image))
    }

    /// Like [`Database::read_txn`], also passing the stored image size read
    /// under the same guard.
    fn read_txn_with_size<R, F>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(Image, u64) -> CoreResult<R>,
    {
        self.ensure_open()?;
        let backend = self.backend.read();
        (|| -> CoreResult<R> {
            let size = backend.size().map_err(CoreError::OpenFailure)?;
            let image = load_image(&**backend, &self.stats)?;
            f(image, size)
        })()
        .inspect_err(|_| self.stats.record_error())
    }

    /// Runs `f` on a freshly loaded image under the write lock and persists
    /// the image if `f` reports a change.
    ///
    /// The lock is held from the load until the persist returns.
    fn write_txn<R, F>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Image) -> CoreResult<(R, bool)>,
    {
        self.ensure_open()?;
        let mut backend = self.backend.write();
        let result = (|| -> CoreResult<R> {
            let mut image = load_image(&**backend, &self.stats)?;
            let (result, changed) = f(&mut image)?;
            if changed {
                persist_image(&mut **backend, &mut image, &self.config, &self.stats)?;
            }
            Ok(result)
        })();
        result.inspect_err(|_| self.stats.record_error())
    }

    fn replace_typed<T: Record>(
        &self,
        collection: &str,
        records: &mut [T],
        expected: Option<&CollectionVersion>,
    ) -> CoreResult<CollectionVersion> {
        validate_collection_name(collection)?;
        let now = Utc::now();
        let encoded = records
            .iter()
            .map(|record| encode_record(collection, record))
            .collect::<CoreResult<Vec<_>>>()?;

        let version = self.replace_at(collection, encoded, now, expected)?;
        for record in records.iter_mut() {
            record.meta_mut().stamp_updated(now);
        }
        Ok(version)
    }

    fn replace_at(
        &self,
        collection: &str,
        mut records: Vec<RawRecord>,
        now: DateTime<Utc>,
        expected: Option<&CollectionVersion>,
    ) -> CoreResult<CollectionVersion> {
        validate_collection_name(collection)?;
        for record in &mut records {
            stamp_raw_updated(record, now);
        }

        self.write_txn(|image| {
            image.ensure_collection(collection);
            if let Some(expected) = expected {
                let actual = image.version(collection);
                if actual != *expected {
                    self.stats.record_conflict();
                    debug!(collection, %expected, %actual, "replace rejected");
                    return Err(CoreError::Conflict {
                        collection: collection.to_string(),
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }

            let count = records.len();
            image.replace(collection, records);
            self.stats.record_replace();
            debug!(collection, records = count, "collection replaced");
            Ok((image.version(collection), true))
        })
    }
}

/// Rejects names that cannot designate a collection.
fn validate_collection_name(name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::invalid_collection_name(name));
    }
    Ok(())
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("is_open", &self.is_open())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordMeta;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Toy {
        #[serde(flatten)]
        meta: RecordMeta,
        name: String,
        #[serde(default)]
        price: u32,
    }

    impl Record for Toy {
        fn meta(&self) -> &RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    }

    fn toy(name: &str) -> Toy {
        Toy {
            meta: RecordMeta::default(),
            name: name.to_string(),
            price: 10,
        }
    }

    /// Backend that stores nothing and fails every write.
    struct ReadOnlyBackend {
        inner: InMemoryBackend,
    }

    impl StorageBackend for ReadOnlyBackend {
        fn read_all(&self) -> shelfdb_storage::StorageResult<Vec<u8>> {
            self.inner.read_all()
        }

        fn write_all(&mut self, _data: &[u8]) -> shelfdb_storage::StorageResult<()> {
            Err(StorageError::write(
                ":read-only:",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }

        fn sync(&mut self) -> shelfdb_storage::StorageResult<()> {
            Ok(())
        }

        fn exists(&self) -> shelfdb_storage::StorageResult<bool> {
            self.inner.exists()
        }

        fn size(&self) -> shelfdb_storage::StorageResult<u64> {
            self.inner.size()
        }

        fn location(&self) -> String {
            ":read-only:".to_string()
        }
    }

    fn create_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn open_in_memory() {
        let db = create_db();
        assert!(db.is_open());
        assert!(db.path().is_none());
        assert!(db.collection_names().unwrap().is_empty());
        // Writing the initial image is not counted against the handle.
        assert_eq!(db.stats().persists, 0);
    }

    #[test]
    fn open_without_image_and_no_create_fails() {
        let result = Database::open_with_backend(
            Config::default().create_if_missing(false),
            Box::new(InMemoryBackend::new()),
        );
        assert!(matches!(result, Err(CoreError::OpenFailure(_))));
    }

    #[test]
    fn create_assigns_sequential_identities() {
        let db = create_db();

        let teddy = db.create("toys", &mut toy("Teddy")).unwrap();
        let car = db.create("toys", &mut toy("Car")).unwrap();

        assert_eq!(teddy.id(), "1");
        assert_eq!(car.id(), "2");
        assert_eq!(db.counter("toys").unwrap(), 2);
    }

    #[test]
    fn create_stamps_callers_record() {
        let db = create_db();
        let before = Utc::now();

        let mut teddy = toy("Teddy");
        let returned = db.create("toys", &mut teddy).unwrap();

        assert_eq!(teddy, returned);
        assert_eq!(teddy.meta.id, "1");
        assert!(teddy.meta.created_at >= before);
        assert_eq!(teddy.meta.created_at, teddy.meta.updated_at);
    }

    #[test]
    fn create_overwrites_caller_supplied_identity() {
        let db = create_db();
        let mut t = toy("Teddy");
        t.meta.id = "99".into();

        db.create("toys", &mut t).unwrap();
        assert_eq!(t.id(), "1");
    }

    #[test]
    fn identities_are_per_collection() {
        let db = create_db();

        db.create("toys", &mut toy("Teddy")).unwrap();
        db.create("toys", &mut toy("Car")).unwrap();
        let first_book = db.create("books", &mut toy("Dune")).unwrap();

        assert_eq!(first_book.id(), "1");
    }

    #[test]
    fn failed_persist_restores_record() {
        let inner = InMemoryBackend::with_data(Image::new().encode(false).unwrap());
        let db = Database::open_with_backend(
            Config::default(),
            Box::new(ReadOnlyBackend {
                inner: inner.clone(),
            }),
        )
        .unwrap();

        let mut t = toy("Teddy");
        let result = db.create("toys", &mut t);

        assert!(matches!(result, Err(CoreError::WriteFailure(_))));
        assert!(result.unwrap_err().may_have_partial_write());
        assert_eq!(t.meta, RecordMeta::default());
        assert_eq!(db.stats().errors, 1);
        assert!(db.fetch_collection("toys").unwrap().is_empty());
    }

    #[test]
    fn fetch_unknown_collection_is_empty() {
        let db = create_db();
        assert!(db.fetch_collection("nothing").unwrap().is_empty());
    }

    #[test]
    fn fetch_does_not_persist_lazy_collection() {
        let db = create_db();
        db.fetch_collection("ghost").unwrap();
        assert!(db.collection_names().unwrap().is_empty());
        assert_eq!(db.stats().persists, 0);
    }

    #[test]
    fn fetch_is_idempotent() {
        let db = create_db();
        db.create("toys", &mut toy("Teddy")).unwrap();

        let first = db.fetch_collection("toys").unwrap();
        let second = db.fetch_collection("toys").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn typed_fetch_roundtrip() {
        let db = create_db();
        let created = db.create("toys", &mut toy("Teddy")).unwrap();

        let fetched: Vec<Toy> = db.fetch("toys").unwrap();
        assert_eq!(fetched, vec![created]);
    }

    #[test]
    fn typed_fetch_reports_decode_errors() {
        let db = create_db();
        db.replace_collection_raw("toys", vec![json!({"name": 42})])
            .unwrap();

        let result: CoreResult<Vec<Toy>> = db.fetch("toys");
        assert!(matches!(result, Err(CoreError::Decode { .. })));
    }

    #[test]
    fn filter_equals_scenario() {
        let db = create_db();
        db.create("toys", &mut toy("Teddy")).unwrap();
        db.create("toys", &mut toy("Car")).unwrap();

        let all = db.fetch_collection("toys").unwrap();
        assert_eq!(all[0]["name"], json!("Teddy"));
        assert_eq!(all[1]["name"], json!("Car"));

        let cars = db.filter_equals("toys", "name", "Car").unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0]["id"], json!("2"));

        assert!(db.filter_equals("toys", "price", "10").unwrap().is_empty());
        assert_eq!(db.filter_equals("toys", "price", 10u32).unwrap().len(), 2);
    }

    #[test]
    fn replace_keeps_identity_and_drops_omitted() {
        let db = create_db();
        let a = db.create("toys", &mut toy("A")).unwrap();
        db.create("toys", &mut toy("B")).unwrap();

        let mut keep = vec![a.clone()];
        db.replace_collection("toys", &mut keep).unwrap();

        let fetched: Vec<Toy> = db.fetch("toys").unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id(), "1");
        assert_eq!(fetched[0].meta.created_at, a.meta.created_at);
        assert!(fetched[0].meta.updated_at >= a.meta.updated_at);
        assert_eq!(keep[0].meta.updated_at, fetched[0].meta.updated_at);
    }

    #[test]
    fn counter_survives_delete_by_replace() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();
        db.create("toys", &mut toy("B")).unwrap();

        db.replace_collection::<Toy>("toys", &mut []).unwrap();
        let c = db.create("toys", &mut toy("C")).unwrap();

        assert_eq!(c.id(), "3");
    }

    #[test]
    fn plain_replace_discards_intervening_create() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();

        let mut stale: Vec<Toy> = db.fetch("toys").unwrap();
        db.create("toys", &mut toy("B")).unwrap();
        db.replace_collection("toys", &mut stale).unwrap();

        // Unchecked replace is last-writer-wins: B is gone, its id stays used.
        let left: Vec<Toy> = db.fetch("toys").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "A");
        assert_eq!(db.counter("toys").unwrap(), 2);
        assert_eq!(db.create("toys", &mut toy("C")).unwrap().id(), "3");
    }

    #[test]
    fn checked_replace_detects_intervening_create() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();

        let (records, version) = db.fetch_versioned("toys").unwrap();
        assert_eq!(records.len(), 1);

        db.create("toys", &mut toy("B")).unwrap();

        let mut stale: Vec<Toy> = vec![];
        let result = db.replace_collection_checked("toys", &version, &mut stale);
        assert!(matches!(result, Err(CoreError::Conflict { .. })));
        assert_eq!(db.fetch_collection("toys").unwrap().len(), 2);
        assert_eq!(db.stats().conflicts, 1);
    }

    #[test]
    fn checked_replace_succeeds_when_unchanged() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();

        let (_, version) = db.fetch_versioned("toys").unwrap();
        let mut records: Vec<Toy> = db.fetch("toys").unwrap();
        records[0].name = "A2".into();

        let new_version = db
            .replace_collection_checked("toys", &version, &mut records)
            .unwrap();
        assert_ne!(new_version, version);
        assert_eq!(db.fetch_versioned("toys").unwrap().1, new_version);
    }

    #[test]
    fn modify_collection_edits_under_one_lock() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();
        db.create("toys", &mut toy("B")).unwrap();

        let removed = db
            .modify_collection("toys", |records| {
                let before = records.len();
                records.retain(|r| r["name"] != json!("A"));
                Ok(before - records.len())
            })
            .unwrap();

        assert_eq!(removed, 1);
        let left = db.fetch_collection("toys").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["id"], json!("2"));
    }

    #[test]
    fn modify_without_change_does_not_persist() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();
        let persists = db.stats().persists;

        db.modify_collection("toys", |_| Ok(())).unwrap();
        assert_eq!(db.stats().persists, persists);
    }

    #[test]
    fn modify_closure_uses_values_read_beforehand() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();
        db.create("cars", &mut toy("Mini")).unwrap();

        // Reads happen outside the closure; it only edits the list it is given.
        let cars = db.fetch_collection("cars").unwrap();
        db.modify_collection("toys", |records| {
            records.extend(cars);
            Ok(())
        })
        .unwrap();

        let toys = db.fetch_collection("toys").unwrap();
        assert_eq!(toys.len(), 2);
        assert_eq!(toys[1]["name"], json!("Mini"));
    }

    #[test]
    fn modify_error_discards_changes() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();

        let result: CoreResult<()> = db.modify_collection("toys", |records| {
            records.clear();
            Err(CoreError::invalid_collection_name("abort"))
        });

        assert!(result.is_err());
        assert_eq!(db.fetch_collection("toys").unwrap().len(), 1);
    }

    #[test]
    fn empty_collection_name_rejected() {
        let db = create_db();
        let result = db.create("", &mut toy("A"));
        assert!(matches!(result, Err(CoreError::InvalidCollectionName { .. })));
        assert!(db.fetch_collection("  ").is_err());
    }

    #[test]
    fn meta_total_is_maintained() {
        let backend = InMemoryBackend::new();
        let db = Database::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();

        db.create("toys", &mut toy("A")).unwrap();
        db.create("books", &mut toy("B")).unwrap();
        db.create("books", &mut toy("C")).unwrap();

        let image = Image::decode(&backend.data().unwrap()).unwrap();
        assert_eq!(image.meta.total, 3);

        db.replace_collection::<Toy>("books", &mut []).unwrap();
        let image = Image::decode(&backend.data().unwrap()).unwrap();
        assert_eq!(image.meta.total, 1);
    }

    #[test]
    fn corrupt_image_heals_on_create() {
        let backend = InMemoryBackend::new();
        let db = Database::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
        db.create("toys", &mut toy("A")).unwrap();

        backend.set_data(b"\x00garbage".to_vec());

        let created = db.create("cars", &mut toy("Mini")).unwrap();
        assert_eq!(created.id(), "1");
        assert_eq!(db.collection_names().unwrap(), vec!["cars".to_string()]);
        assert_eq!(db.stats().images_healed, 1);
    }

    #[test]
    fn summary_lists_collections() {
        let db = create_db();
        db.create("toys", &mut toy("A")).unwrap();
        db.create("toys", &mut toy("B")).unwrap();
        db.create("books", &mut toy("C")).unwrap();

        let summary = db.summary().unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.collections.len(), 2);
        assert_eq!(summary.collections[0].name, "books");
        assert_eq!(summary.collections[1].counter, 2);
        assert!(summary.image_bytes > 0);
    }

    #[test]
    fn summary_size_matches_stored_image() {
        let backend = InMemoryBackend::new();
        let db = Database::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
        db.create("toys", &mut toy("A")).unwrap();

        let summary = db.summary().unwrap();
        assert_eq!(summary.image_bytes, backend.data().unwrap().len() as u64);
        assert_eq!(summary.total_records, 1);

        db.close().unwrap();
        assert!(matches!(db.summary(), Err(CoreError::DatabaseClosed)));
    }

    #[test]
    fn close_database() {
        let db = create_db();
        db.close().unwrap();
        assert!(!db.is_open());

        let result = db.fetch_collection("toys");
        assert!(matches!(result, Err(CoreError::DatabaseClosed)));
    }
}
