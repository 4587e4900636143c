//! Fuzz testing harnesses for ShelfDB.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks.

use crate::fixtures::Toy;
use serde_json::Value;
use shelfdb_core::{Config, Database, FieldValue, Image, Record};
use shelfdb_storage::InMemoryBackend;

/// Fuzz target for image decoding.
///
/// Tests that arbitrary byte sequences either decode to an image that
/// re-encodes, or return a proper error (no panics).
pub fn fuzz_image_decode(data: &[u8]) {
    if let Ok(image) = Image::decode(data) {
        let encoded = image.encode(false).expect("Decoded image must re-encode");
        let again = Image::decode(&encoded).expect("Re-encoded image must decode");
        assert_eq!(image.items, again.items, "Roundtrip mismatch");
    }
}

/// Fuzz target for opening a database over arbitrary bytes.
///
/// Whatever the stored bytes, opening succeeds and the next create starts
/// from a usable image with a fresh identity.
pub fn fuzz_open_arbitrary_image(data: &[u8]) {
    let backend = InMemoryBackend::with_data(data.to_vec());
    let db = Database::open_with_backend(Config::default(), Box::new(backend))
        .expect("Opening an existing image never fails");

    let before = db.counter("fuzz").expect("Counter read must not fail");
    let created = db
        .create("fuzz", &mut Toy::new("seed", 1))
        .expect("Create over any image must succeed");
    assert_eq!(created.id(), (before + 1).to_string());
}

/// Fuzz target for database operations.
///
/// Tests that arbitrary operation sequences don't cause panics and never
/// hand out an identity twice.
pub fn fuzz_database_operations(data: &[u8]) {
    let db = match Database::open_in_memory() {
        Ok(db) => db,
        Err(_) => return,
    };

    let mut issued = std::collections::HashSet::new();

    for chunk in data.chunks(2) {
        let op = chunk[0];
        let arg = chunk.get(1).copied().unwrap_or(0);
        let collection = if op & 0x10 == 0 { "a" } else { "b" };

        match op % 4 {
            0 => {
                if let Ok(toy) = db.create(collection, &mut Toy::new("x", i64::from(arg))) {
                    assert!(
                        issued.insert((collection, toy.meta.id.clone())),
                        "Identity issued twice"
                    );
                }
            }
            1 => {
                let _ = db.filter_equals(collection, "price", FieldValue::Integer(i64::from(arg)));
            }
            2 => {
                let _ = db.modify_collection(collection, |records| {
                    let keep = usize::from(arg) % (records.len() + 1);
                    records.truncate(keep);
                    Ok(())
                });
            }
            _ => {
                let _ = db.fetch_collection(collection).map(|records| {
                    assert!(records.iter().all(Value::is_object));
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::image_bytes_strategy;
    use proptest::prelude::*;

    #[test]
    fn fuzz_known_inputs() {
        fuzz_image_decode(b"");
        fuzz_image_decode(b"{}");
        fuzz_image_decode(br#"{"items": {"t": [1, "x", null]}}"#);
        fuzz_open_arbitrary_image(b"\xff\xfe");
        fuzz_open_arbitrary_image(br#"{"items": {"fuzz": [{"id": "9"}]}}"#);
        fuzz_database_operations(&[0, 5, 0, 6, 2, 1, 16, 3, 3, 0, 1, 6]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn decode_never_panics(data in image_bytes_strategy()) {
            fuzz_image_decode(&data);
        }

        #[test]
        fn open_never_fails(data in image_bytes_strategy()) {
            fuzz_open_arbitrary_image(&data);
        }

        #[test]
        fn operations_never_panic(data in prop::collection::vec(any::<u8>(), 0..64)) {
            fuzz_database_operations(&data);
        }
    }
}
