//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use crate::fixtures::Toy;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use shelfdb_core::FieldValue;

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating unsaved toys.
pub fn toy_strategy() -> impl Strategy<Value = Toy> {
    (
        prop::string::string_regex("[A-Za-z ]{1,16}").expect("Invalid regex"),
        -1_000i64..1_000,
        any::<bool>(),
    )
        .prop_map(|(name, price, soft)| Toy::new(name, price).soft(soft))
}

/// Strategy for generating scalar JSON values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::string::string_regex("[a-z]{0,8}")
            .expect("Invalid regex")
            .prop_map(Value::String),
        any::<i64>().prop_map(|n| json!(n)),
        any::<u64>().prop_map(|n| json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|x| json!(x)),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

/// Strategy for generating wanted values for equality filters.
pub fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        prop::string::string_regex("[a-z]{0,8}")
            .expect("Invalid regex")
            .prop_map(FieldValue::String),
        any::<i64>().prop_map(FieldValue::Integer),
        any::<u64>().prop_map(FieldValue::Unsigned),
        (-1.0e6f64..1.0e6).prop_map(FieldValue::Float),
        any::<bool>().prop_map(FieldValue::Bool),
    ]
}

/// Strategy for generating heterogeneous stored records.
///
/// Field names come from a small alphabet so records share fields with
/// clashing types.
pub fn raw_record_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        prop::sample::select(vec!["a", "b", "c", "name", "price"]),
        scalar_value_strategy(),
        0..5,
    )
    .prop_map(|fields| {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<Map<String, Value>>(),
        )
    })
}

/// Strategy for generating byte strings that are usually not valid images.
pub fn image_bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..256),
        prop::string::string_regex(r#"\{"items": ?\{[a-z":\[\], 0-9]{0,40}"#)
            .expect("Invalid regex")
            .prop_map(String::into_bytes),
    ]
}
