//! Typed collection API.
//!
//! Provides `Collection<T>` for type-safe record storage with automatic
//! JSON encoding/decoding via the `Record` trait.

mod typed;

pub use typed::Collection;
