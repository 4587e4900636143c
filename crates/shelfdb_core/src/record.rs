//! Record metadata and the `Record` capability trait.

use crate::error::{CoreError, CoreResult};
use crate::types::RawRecord;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// JSON key of the record identity.
pub const ID_FIELD: &str = "id";
/// JSON key of the creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";
/// JSON key of the last-update timestamp.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Metadata carried by every stored record.
///
/// Embed it in a record type with `#[serde(flatten)]` so the fields sit at
/// the top level of the stored JSON object:
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use shelfdb_core::{Record, RecordMeta};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Toy {
///     #[serde(flatten)]
///     meta: RecordMeta,
///     name: String,
/// }
///
/// impl Record for Toy {
///     fn meta(&self) -> &RecordMeta {
///         &self.meta
///     }
///     fn meta_mut(&mut self) -> &mut RecordMeta {
///         &mut self.meta
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Identity within the collection, assigned on create.
    #[serde(default)]
    pub id: String,
    /// When the record was created.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// When the record was soft-deleted, if it was.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
}

impl RecordMeta {
    /// Stamps a freshly minted identity and both timestamps.
    pub fn stamp_created(&mut self, sequence: u64, now: DateTime<Utc>) {
        self.id = sequence.to_string();
        self.created_at = now;
        self.updated_at = now;
    }

    /// Stamps the last-update timestamp.
    pub fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Marks the record as soft-deleted.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_at = Some(now);
    }

    /// Returns `true` if the record has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// A value that can be stored in a ShelfDB collection.
///
/// Implementors expose their embedded [`RecordMeta`]; the store uses it to
/// assign identity and timestamps. The remaining fields are opaque to the
/// store and travel through `serde`.
///
/// Records must serialize to a JSON object.
pub trait Record: Serialize + DeserializeOwned {
    /// Returns the record's metadata.
    fn meta(&self) -> &RecordMeta;

    /// Returns the record's metadata for stamping.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Returns the record's identity ("" before it is created).
    fn id(&self) -> &str {
        &self.meta().id
    }
}

/// Encodes a record into its stored form.
pub(crate) fn encode_record<T: Serialize>(collection: &str, record: &T) -> CoreResult<RawRecord> {
    let value =
        serde_json::to_value(record).map_err(|e| CoreError::encode(collection, e.to_string()))?;
    if !value.is_object() {
        return Err(CoreError::encode(
            collection,
            "records must serialize to a JSON object",
        ));
    }
    Ok(value)
}

/// Decodes a stored record into `T`.
pub(crate) fn decode_record<T: DeserializeOwned>(
    collection: &str,
    raw: RawRecord,
) -> CoreResult<T> {
    serde_json::from_value(raw).map_err(|e| CoreError::decode(collection, e))
}

/// Sets the `updated_at` key of a stored record.
///
/// Non-object records are left as they are.
pub(crate) fn stamp_raw_updated(record: &mut RawRecord, now: DateTime<Utc>) {
    if let Some(object) = record.as_object_mut() {
        object.insert(
            UPDATED_AT_FIELD.to_string(),
            RawRecord::String(now.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
        );
    }
}

/// Returns the identity of a stored record, if it has one.
pub(crate) fn raw_id(record: &RawRecord) -> Option<&str> {
    record.get(ID_FIELD).and_then(RawRecord::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Toy {
        #[serde(flatten)]
        meta: RecordMeta,
        name: String,
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
        }
    }

    #[test]
    fn stamp_created_sets_identity_and_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut meta = RecordMeta::default();
        meta.stamp_created(7, now);

        assert_eq!(meta.id, "7");
        assert_eq!(meta.created_at, now);
        assert_eq!(meta.updated_at, now);
        assert!(meta.deleted_at.is_none());
    }

    #[test]
    fn mark_deleted_sets_flag_pair() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut meta = RecordMeta::default();
        meta.mark_deleted(now);

        assert!(meta.is_deleted());
        assert_eq!(meta.deleted_at, Some(now));
    }

    #[test]
    fn encoded_record_is_flat_object() {
        let mut t = toy("Teddy");
        t.meta.id = "1".into();

        let raw = encode_record("toys", &t).unwrap();
        assert_eq!(raw["id"], json!("1"));
        assert_eq!(raw["name"], json!("Teddy"));
        assert_eq!(raw["deleted"], json!(false));
        assert!(raw.get("meta").is_none());
    }

    #[test]
    fn encode_rejects_non_objects() {
        let result = encode_record("numbers", &42);
        assert!(matches!(result, Err(CoreError::Encode { .. })));
    }

    #[test]
    fn decode_tolerates_missing_metadata() {
        let t: Toy = decode_record("toys", json!({"name": "Car"})).unwrap();
        assert_eq!(t.name, "Car");
        assert_eq!(t.id(), "");
    }

    #[test]
    fn decode_reports_type_mismatch() {
        let result: CoreResult<Toy> = decode_record("toys", json!({"name": 5}));
        assert!(matches!(result, Err(CoreError::Decode { .. })));
    }

    #[test]
    fn raw_stamp_roundtrips_through_typed_decode() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let mut raw = encode_record("toys", &toy("Teddy")).unwrap();
        stamp_raw_updated(&mut raw, now);

        let t: Toy = decode_record("toys", raw).unwrap();
        assert_eq!(t.meta.updated_at, now);
    }

    #[test]
    fn raw_stamp_skips_non_objects() {
        let now = Utc::now();
        let mut raw = json!([1, 2, 3]);
        stamp_raw_updated(&mut raw, now);
        assert_eq!(raw, json!([1, 2, 3]));
    }

    #[test]
    fn raw_id_lookup() {
        assert_eq!(raw_id(&json!({"id": "3"})), Some("3"));
        assert_eq!(raw_id(&json!({"id": 3})), None);
        assert_eq!(raw_id(&json!("3")), None);
    }
}
