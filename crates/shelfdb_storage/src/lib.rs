//! # ShelfDB Storage
//!
//! Whole-image storage backends for ShelfDB.
//!
//! This crate provides the lowest-level storage abstraction for ShelfDB.
//! Backends are **opaque image stores**: they hold exactly one byte image,
//! hand it back in full on read, and replace it in full on write. They do
//! not interpret the bytes.
//!
//! ## Design Principles
//!
//! - One backend holds one image (read everything, overwrite everything)
//! - No knowledge of the JSON image format
//! - Must be `Send + Sync` so a database handle can be shared across threads
//! - ShelfDB owns all format interpretation
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage in a single file
//!
//! ## Example
//!
//! ```rust
//! use shelfdb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_all(b"{}").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"{}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, WriteMode};
pub use memory::InMemoryBackend;
