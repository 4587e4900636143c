//! Error types for ShelfDB core.

use shelfdb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ShelfDB core operations.
///
/// An image that opens but does not decode is not an error: it is replaced
/// by an empty image. Absent collections and records are not errors either;
/// they produce empty results.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The backing image could not be opened or read.
    #[error("cannot open database image: {0}")]
    OpenFailure(#[source] StorageError),

    /// The in-memory image could not be encoded. Nothing was written.
    #[error("cannot serialize database image: {0}")]
    SerializationFailure(#[source] serde_json::Error),

    /// The encoded image could not be written. The backing file may be partial.
    #[error("cannot write database image: {0}")]
    WriteFailure(#[source] StorageError),

    /// A caller's record could not be encoded as a JSON object.
    #[error("cannot encode record for collection {collection}: {message}")]
    Encode {
        /// Target collection.
        collection: String,
        /// Description of the failure.
        message: String,
    },

    /// A stored record does not decode into the requested type.
    #[error("cannot decode record in collection {collection}: {source}")]
    Decode {
        /// Source collection.
        collection: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Collection names must be non-empty.
    #[error("invalid collection name: {name:?}")]
    InvalidCollectionName {
        /// The rejected name.
        name: String,
    },

    /// A checked replace found the collection changed since it was fetched.
    #[error("collection {collection} changed since it was read (expected {expected}, found {actual})")]
    Conflict {
        /// The collection being replaced.
        collection: String,
        /// Version the caller read.
        expected: String,
        /// Version currently stored.
        actual: String,
    },

    /// Another handle holds the database's exclusive lock.
    #[error("database locked: another handle has exclusive access")]
    DatabaseLocked,

    /// Database is closed.
    #[error("database is closed")]
    DatabaseClosed,
}

impl CoreError {
    /// Creates an encode error.
    pub fn encode(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(collection: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            collection: collection.into(),
            source,
        }
    }

    /// Creates an invalid collection name error.
    pub fn invalid_collection_name(name: impl Into<String>) -> Self {
        Self::InvalidCollectionName { name: name.into() }
    }

    /// Returns `true` if the on-disk image may have been left partially written.
    #[must_use]
    pub fn may_have_partial_write(&self) -> bool {
        matches!(self, Self::WriteFailure(_))
    }
}
