//! Core type definitions for ShelfDB.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// A record as stored in the image: a decoded, untyped JSON value.
///
/// Records written through the typed API are always JSON objects. Images
/// produced elsewhere may contain other values; those never match a filter.
pub type RawRecord = Value;

/// Digest of one collection's stored state.
///
/// Two reads of the same collection yield equal versions iff neither the
/// record list nor the sequence counter changed in between. Used by
/// [`crate::Database::replace_collection_checked`] to detect lost updates.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionVersion([u8; 32]);

impl CollectionVersion {
    /// Computes the version of a collection's records and counter.
    #[must_use]
    pub fn compute(records: &[RawRecord], counter: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_le_bytes());
        for record in records {
            // serde_json maps are ordered, so this encoding is deterministic.
            hasher.update(record.to_string().as_bytes());
            hasher.update([0u8]);
        }
        Self(hasher.finalize().into())
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the digest as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for CollectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionVersion({self})")
    }
}

impl fmt::Display for CollectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..16])
    }
}
