//! Typed collection implementation.

use crate::database::Database;
use crate::error::CoreResult;
use crate::filter::{filter_by, FieldValue};
use crate::record::{decode_record, encode_record, raw_id, Record};
use crate::types::CollectionVersion;
use chrono::Utc;
use std::marker::PhantomData;

/// A typed view of one collection.
///
/// `Collection<T>` wraps the untyped [`Database`] operations, encoding and
/// decoding `T` through `serde`. Each method is a single database operation
/// with its own lock scope.
///
/// # Language-Native Querying
///
/// ShelfDB has no query language. Besides [`Collection::where_eq`], filter
/// with host-language closures:
///
/// ```rust,ignore
/// let cars: Vec<Toy> = toys.filter_by(|t| t.name.as_str(), "Car")?;
/// let pricey: Vec<Toy> = toys.filter(|t| t.price > 20)?;
/// ```
///
/// # Example
///
/// ```rust,ignore
/// use shelfdb_core::Database;
///
/// let db = Database::open_in_memory()?;
/// let toys = db.collection::<Toy>("toys")?;
///
/// let teddy = toys.create(&mut Toy::new("Teddy"))?;
/// let found = toys.get(teddy.id())?;
///
/// toys.update(teddy.id(), |t| t.price = 15)?;
/// toys.delete(teddy.id())?;
/// ```
pub struct Collection<'db, T: Record + Clone> {
    /// Owning database.
    db: &'db Database,
    /// Collection name.
    name: String,
    /// Type marker.
    _marker: PhantomData<fn() -> T>,
}

impl<'db, T: Record + Clone> Collection<'db, T> {
    /// Creates a typed view. The name must already be validated.
    pub(crate) fn new(db: &'db Database, name: String) -> Self {
        Self {
            db,
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a record. See [`Database::create`].
    pub fn create(&self, record: &mut T) -> CoreResult<T> {
        self.db.create(&self.name, record)
    }

    /// Returns every record in insertion order.
    pub fn all(&self) -> CoreResult<Vec<T>> {
        self.db.fetch(&self.name)
    }

    /// Returns every record together with the collection version.
    pub fn fetch_versioned(&self) -> CoreResult<(Vec<T>, CollectionVersion)> {
        let (raw, version) = self.db.fetch_versioned(&self.name)?;
        let records = raw
            .into_iter()
            .map(|r| decode_record(&self.name, r))
            .collect::<CoreResult<Vec<T>>>()?;
        Ok((records, version))
    }

    /// Gets a record by identity.
    ///
    /// Returns `None` if no record has this identity.
    pub fn get(&self, id: &str) -> CoreResult<Option<T>> {
        self.db
            .fetch_collection(&self.name)?
            .into_iter()
            .find(|r| raw_id(r) == Some(id))
            .map(|r| decode_record(&self.name, r))
            .transpose()
    }

    /// Returns the records whose `field` equals `value`.
    pub fn where_eq(&self, field: &str, value: impl Into<FieldValue>) -> CoreResult<Vec<T>> {
        self.db
            .filter_equals(&self.name, field, value)?
            .into_iter()
            .map(|r| decode_record(&self.name, r))
            .collect()
    }

    /// Returns the records whose accessed field equals `value`.
    ///
    /// **Warning**: Every record is decoded; this is a full scan.
    pub fn filter_by<V, F>(&self, accessor: F, value: &V) -> CoreResult<Vec<T>>
    where
        V: PartialEq + ?Sized,
        F: Fn(&T) -> &V,
    {
        Ok(filter_by(&self.all()?, accessor, value))
    }

    /// Returns the records matching a host-language predicate.
    ///
    /// **Warning**: Every record is decoded; this is a full scan.
    pub fn filter<F>(&self, predicate: F) -> CoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all()?.into_iter().filter(|r| predicate(r)).collect())
    }

    /// Returns the number of stored records, soft-deleted ones included.
    pub fn count(&self) -> CoreResult<usize> {
        Ok(self.db.fetch_collection(&self.name)?.len())
    }

    /// Replaces the whole collection. See [`Database::replace_collection`].
    pub fn replace(&self, records: &mut [T]) -> CoreResult<()> {
        self.db.replace_collection(&self.name, records)
    }

    /// Replaces the whole collection if it is still at `expected`.
    pub fn replace_checked(
        &self,
        expected: &CollectionVersion,
        records: &mut [T],
    ) -> CoreResult<CollectionVersion> {
        self.db
            .replace_collection_checked(&self.name, expected, records)
    }

    /// Applies `f` to the record with identity `id` and stores the result.
    ///
    /// The identity and creation timestamp survive whatever `f` does to
    /// them. Returns the updated record, or `None` (nothing written) if no
    /// record has this identity.
    ///
    /// `f` runs under the database's write lock and must not call back into
    /// the database; the lock is not reentrant.
    pub fn update<F>(&self, id: &str, f: F) -> CoreResult<Option<T>>
    where
        F: FnOnce(&mut T),
    {
        let now = Utc::now();
        self.db.modify_collection_at(&self.name, now, |records| {
            let Some(position) = records.iter().position(|r| raw_id(r) == Some(id)) else {
                return Ok(None);
            };

            let mut record: T = decode_record(&self.name, records[position].clone())?;
            let kept = record.meta().clone();
            f(&mut record);

            let meta = record.meta_mut();
            meta.id = kept.id;
            meta.created_at = kept.created_at;
            meta.stamp_updated(now);

            records[position] = encode_record(&self.name, &record)?;
            Ok(Some(record))
        })
    }

    /// Applies `f` to every record matching `predicate` and stores the
    /// result, all under one write lock.
    ///
    /// Identities and creation timestamps are kept as in
    /// [`Collection::update`]. Returns the updated records; nothing is
    /// written when none match.
    ///
    /// The closures run under the database's write lock and must not call
    /// back into the database; the lock is not reentrant.
    pub fn update_where<P, F>(&self, predicate: P, mut f: F) -> CoreResult<Vec<T>>
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let now = Utc::now();
        self.db.modify_collection_at(&self.name, now, |records| {
            let mut updated = Vec::new();
            for raw in records.iter_mut() {
                let mut record: T = decode_record(&self.name, raw.clone())?;
                if !predicate(&record) {
                    continue;
                }
                let kept = record.meta().clone();
                f(&mut record);

                let meta = record.meta_mut();
                meta.id = kept.id;
                meta.created_at = kept.created_at;
                meta.stamp_updated(now);

                *raw = encode_record(&self.name, &record)?;
                updated.push(record);
            }
            Ok(updated)
        })
    }

    /// Removes every record matching `predicate` under one write lock.
    ///
    /// Returns the number of removed records.
    ///
    /// The closures run under the database's write lock and must not call
    /// back into the database; the lock is not reentrant.
    pub fn delete_where<P>(&self, predicate: P) -> CoreResult<usize>
    where
        P: Fn(&T) -> bool,
    {
        self.db.modify_collection(&self.name, |records| {
            let before = records.len();
            let mut kept = Vec::with_capacity(before);
            for raw in records.drain(..) {
                let record: T = decode_record(&self.name, raw.clone())?;
                if !predicate(&record) {
                    kept.push(raw);
                }
            }
            *records = kept;
            Ok(before - records.len())
        })
    }

    /// Removes the record with identity `id`.
    ///
    /// Returns `true` if a record was removed. The identity is not reused.
    pub fn delete(&self, id: &str) -> CoreResult<bool> {
        self.db.modify_collection(&self.name, |records| {
            let before = records.len();
            records.retain(|r| raw_id(r) != Some(id));
            Ok(records.len() != before)
        })
    }

    /// Marks the record with identity `id` as deleted without removing it.
    ///
    /// Returns the marked record, or `None` if no record has this identity.
    /// Marking an already deleted record keeps its original deletion time.
    pub fn soft_delete(&self, id: &str) -> CoreResult<Option<T>> {
        let now = Utc::now();
        self.update(id, |record| {
            let meta = record.meta_mut();
            if !meta.is_deleted() {
                meta.mark_deleted(now);
            }
        })
    }

    /// Returns the records that are not soft-deleted.
    pub fn live(&self) -> CoreResult<Vec<T>> {
        self.filter(|r| !r.meta().is_deleted())
    }
}

impl<T: Record + Clone> std::fmt::Debug for Collection<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
