//! The database image: every collection and its sequence counter.
//!
//! The image is the unit of persistence. It is decoded in full from the
//! backing store at the start of an operation and encoded in full at the end
//! of a mutating one:
//!
//! ```text
//! {
//!   "items":        { "<collection>": [ <record>, ... ], ... },
//!   "meta":         { "total": <records across all collections> },
//!   "data_indexes": { "<collection>": <last assigned sequence>, ... }
//! }
//! ```
//!
//! Missing or `null` top-level keys decode as empty.

use crate::record::raw_id;
use crate::types::{CollectionVersion, RawRecord};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Image-wide bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    /// Number of records across all collections, refreshed on every persist.
    #[serde(default)]
    pub total: u64,
}

/// In-memory form of the whole database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Collection name to ordered record list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: BTreeMap<String, Vec<RawRecord>>,
    /// Image-wide bookkeeping.
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: ImageMeta,
    /// Collection name to last assigned sequence number.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_indexes: BTreeMap<String, u64>,
}

impl Image {
    /// Creates an empty image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an image from its JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the bytes are not a valid image.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encodes the image to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if a record cannot be encoded.
    pub fn encode(&self, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
        if pretty {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        }
    }

    /// Makes sure `name` has a record list and a counter.
    ///
    /// A counter missing next to an existing list starts at the highest
    /// numeric identity in that list, so identities are not handed out twice.
    /// Returns `true` if anything was created. This only touches the
    /// in-memory image; nothing is persisted.
    pub fn ensure_collection(&mut self, name: &str) -> bool {
        let mut created = false;
        if !self.items.contains_key(name) {
            self.items.insert(name.to_string(), Vec::new());
            created = true;
        }
        if !self.data_indexes.contains_key(name) {
            let highest = self.highest_numeric_id(name);
            self.data_indexes.insert(name.to_string(), highest);
            created = true;
        }
        if created {
            debug!(collection = name, "collection initialized in image");
        }
        created
    }

    /// Returns `true` if the image knows `name`.
    #[must_use]
    pub fn has_collection(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Returns the records of `name` (empty if absent).
    #[must_use]
    pub fn records(&self, name: &str) -> &[RawRecord] {
        self.items.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Takes the records of `name` out of the image.
    pub fn take_records(&mut self, name: &str) -> Vec<RawRecord> {
        self.items.get_mut(name).map(std::mem::take).unwrap_or_default()
    }

    /// Returns the last assigned sequence number of `name` (0 if absent).
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.data_indexes.get(name).copied().unwrap_or(0)
    }

    /// Appends a record to `name` and advances its counter to `sequence`.
    ///
    /// The counter never moves backwards.
    pub fn append(&mut self, name: &str, record: RawRecord, sequence: u64) {
        self.items.entry(name.to_string()).or_default().push(record);
        let counter = self.data_indexes.entry(name.to_string()).or_insert(0);
        *counter = (*counter).max(sequence);
    }

    /// Replaces the record list of `name`. The counter is untouched.
    pub fn replace(&mut self, name: &str, records: Vec<RawRecord>) {
        self.items.insert(name.to_string(), records);
        self.data_indexes.entry(name.to_string()).or_insert(0);
    }

    /// Returns the current version of `name`.
    #[must_use]
    pub fn version(&self, name: &str) -> CollectionVersion {
        CollectionVersion::compute(self.records(name), self.counter(name))
    }

    /// Highest identity in `name` that parses as a sequence number (0 if none).
    #[must_use]
    pub fn highest_numeric_id(&self, name: &str) -> u64 {
        self.records(name)
            .iter()
            .filter_map(|r| raw_id(r).and_then(|id| id.parse::<u64>().ok()))
            .max()
            .unwrap_or(0)
    }

    /// Counts records across every collection.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.items.values().map(|r| r.len() as u64).sum()
    }

    /// Recomputes `meta.total`.
    pub fn refresh_total(&mut self) {
        self.meta.total = self.record_count();
    }

    /// Returns collection names in sorted order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_image_encodes_fixed_shape() {
        let bytes = Image::new().encode(false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({"items": {}, "meta": {"total": 0}, "data_indexes": {}})
        );
    }

    #[test]
    fn decode_full_image() {
        let bytes = br#"{
            "items": {"toys": [{"id": "1", "name": "Teddy"}]},
            "meta": {"total": 1},
            "data_indexes": {"toys": 1}
        }"#;
        let image = Image::decode(bytes).unwrap();
        assert_eq!(image.records("toys").len(), 1);
        assert_eq!(image.counter("toys"), 1);
        assert_eq!(image.meta.total, 1);
    }

    #[test]
    fn decode_tolerates_missing_and_null_keys() {
        let image = Image::decode(br#"{"items": null}"#).unwrap();
        assert_eq!(image, Image::new());

        let image = Image::decode(b"{}").unwrap();
        assert_eq!(image, Image::new());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Image::decode(b"not json").is_err());
        assert!(Image::decode(b"").is_err());
        assert!(Image::decode(br#"{"items": [1, 2]}"#).is_err());
    }

    #[test]
    fn ensure_collection_is_lazy_and_idempotent() {
        let mut image = Image::new();
        assert!(!image.has_collection("toys"));

        assert!(image.ensure_collection("toys"));
        assert!(image.has_collection("toys"));
        assert_eq!(image.counter("toys"), 0);

        assert!(!image.ensure_collection("toys"));
    }

    #[test]
    fn ensure_collection_repairs_missing_counter() {
        let mut image = Image::decode(br#"{"items": {"toys": [{"id": "4"}]}}"#).unwrap();
        assert!(image.ensure_collection("toys"));
        assert_eq!(image.records("toys").len(), 1);
        assert_eq!(image.counter("toys"), 4);
    }

    #[test]
    fn append_advances_counter() {
        let mut image = Image::new();
        image.append("toys", json!({"id": "1"}), 1);
        image.append("toys", json!({"id": "2"}), 2);

        assert_eq!(image.records("toys").len(), 2);
        assert_eq!(image.counter("toys"), 2);
    }

    #[test]
    fn replace_keeps_counter() {
        let mut image = Image::new();
        image.append("toys", json!({"id": "1"}), 1);
        image.append("toys", json!({"id": "2"}), 2);

        image.replace("toys", vec![json!({"id": "1"})]);
        assert_eq!(image.records("toys").len(), 1);
        assert_eq!(image.counter("toys"), 2);
    }

    #[test]
    fn refresh_total_counts_all_collections() {
        let mut image = Image::new();
        image.append("toys", json!({"id": "1"}), 1);
        image.append("cars", json!({"id": "1"}), 1);
        image.append("cars", json!({"id": "2"}), 2);

        image.refresh_total();
        assert_eq!(image.meta.total, 3);
    }

    #[test]
    fn take_records_leaves_empty_list() {
        let mut image = Image::new();
        image.append("toys", json!({"id": "1"}), 1);

        let taken = image.take_records("toys");
        assert_eq!(taken.len(), 1);
        assert!(image.has_collection("toys"));
        assert!(image.records("toys").is_empty());
        assert!(image.take_records("absent").is_empty());
    }

    #[test]
    fn pretty_encoding_decodes_identically() {
        let mut image = Image::new();
        image.append("toys", json!({"id": "1", "name": "Teddy"}), 1);

        let compact = Image::decode(&image.encode(false).unwrap()).unwrap();
        let pretty = Image::decode(&image.encode(true).unwrap()).unwrap();
        assert_eq!(compact, pretty);
    }
}
