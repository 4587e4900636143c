//! Database statistics.
//!
//! Two kinds of numbers are exposed:
//!
//! - [`DatabaseStats`]: atomic operation counters kept by a database handle
//!   since it was opened.
//! - [`ImageSummary`]: a point-in-time description of the stored image
//!   (collections, record counts, counters).
//!
//! # Usage
//!
//! ```rust,ignore
//! use shelfdb_core::Database;
//!
//! let db = Database::open_in_memory()?;
//!
//! // Perform operations...
//!
//! let ops = db.stats();
//! println!("Creates: {}", ops.creates);
//!
//! let summary = db.summary()?;
//! println!("Records: {}", summary.total_records);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one database handle.
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    /// Images read from the backend.
    loads: AtomicU64,
    /// Images written to the backend.
    persists: AtomicU64,
    /// Records created.
    creates: AtomicU64,
    /// Collection fetches (including filters).
    fetches: AtomicU64,
    /// Collection replacements (including modifications).
    replaces: AtomicU64,
    /// Checked replacements rejected as conflicting.
    conflicts: AtomicU64,
    /// Undecodable images replaced by an empty one.
    images_healed: AtomicU64,
    /// Total bytes read.
    bytes_read: AtomicU64,
    /// Total bytes written.
    bytes_written: AtomicU64,
    /// Operations that returned an error.
    errors: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_load(&self, bytes: u64) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_persist(&self, bytes: u64) {
        self.persists.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_create(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replace(&self) {
        self.replaces.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_healed(&self) {
        self.images_healed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            loads: self.loads.load(Ordering::Relaxed),
            persists: self.persists.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            replaces: self.replaces.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            images_healed: self.images_healed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of [`DatabaseStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Images read from the backend.
    pub loads: u64,
    /// Images written to the backend.
    pub persists: u64,
    /// Records created.
    pub creates: u64,
    /// Collection fetches (including filters).
    pub fetches: u64,
    /// Collection replacements (including modifications).
    pub replaces: u64,
    /// Checked replacements rejected as conflicting.
    pub conflicts: u64,
    /// Undecodable images replaced by an empty one.
    pub images_healed: u64,
    /// Total bytes read.
    pub bytes_read: u64,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Operations that returned an error.
    pub errors: u64,
}

/// Per-collection figures from the stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    /// Collection name.
    pub name: String,
    /// Number of stored records.
    pub records: u64,
    /// Last assigned sequence number.
    pub counter: u64,
}

/// Description of the stored image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ImageSummary {
    /// Collections in name order.
    pub collections: Vec<CollectionSummary>,
    /// Records across all collections.
    pub total_records: u64,
    /// Size of the stored image in bytes.
    pub image_bytes: u64,
}
