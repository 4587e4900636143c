//! # ShelfDB Core
//!
//! Core engine for ShelfDB, an embedded JSON document store.
//!
//! This crate provides:
//! - The database image: named collections of JSON records plus per-collection
//!   sequence counters, persisted as one JSON document
//! - Record creation with sequential per-collection identities and timestamps
//! - Whole-collection fetch and replace, with optional conflict detection
//! - Single-field equality filtering
//! - A typed `Collection<T>` view over `serde` record types
//!
//! Every operation reloads the image from its backend and, if it changes
//! anything, writes the whole image back before returning.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod error;
pub mod filter;
mod image;
mod persistence;
mod record;
mod stats;
mod types;

pub use collection::Collection;
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use filter::{all, filter_by, filter_equals, FieldValue};
pub use image::{Image, ImageMeta};
pub use record::{Record, RecordMeta, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
pub use shelfdb_storage::WriteMode;
pub use stats::{CollectionSummary, DatabaseStats, ImageSummary, StatsSnapshot};
pub use types::{CollectionVersion, RawRecord};

/// Crate version, as recorded in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
