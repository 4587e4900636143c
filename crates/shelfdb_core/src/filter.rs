//! Single-field equality filtering over stored records.
//!
//! ShelfDB has no query language. The only predicate the store evaluates
//! itself is "field equals value" over the untyped stored form; anything
//! richer is host-language filtering over typed records, either through a
//! field accessor ([`filter_by`]) or a predicate ([`crate::Collection::filter`]).
//!
//! Comparison is same-type only. A stored field whose JSON type differs from
//! the wanted value's type is a non-match, never an error:
//!
//! | wanted                 | matches stored                             |
//! |------------------------|--------------------------------------------|
//! | [`FieldValue::String`]   | JSON string                                |
//! | [`FieldValue::Integer`]  | JSON integer representable as `i64`        |
//! | [`FieldValue::Unsigned`] | JSON integer representable as `u64`        |
//! | [`FieldValue::Float`]    | JSON number written with a fraction/exponent |
//! | [`FieldValue::Bool`]     | JSON boolean                               |

use crate::types::RawRecord;
use serde_json::Value;
use std::fmt;

/// A value to look for with [`filter_equals`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer.
    Unsigned(u64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
}

impl FieldValue {
    /// Returns `true` if `stored` has this value's type and equals it.
    #[must_use]
    pub fn matches(&self, stored: &Value) -> bool {
        match (self, stored) {
            (Self::String(expected), Value::String(actual)) => expected == actual,
            (Self::Bool(expected), Value::Bool(actual)) => expected == actual,
            (Self::Integer(expected), Value::Number(n)) if !n.is_f64() => {
                n.as_i64() == Some(*expected)
            }
            (Self::Unsigned(expected), Value::Number(n)) if !n.is_f64() => {
                n.as_u64() == Some(*expected)
            }
            (Self::Float(expected), Value::Number(n)) if n.is_f64() => {
                n.as_f64() == Some(*expected)
            }
            _ => false,
        }
    }

    /// Converts a scalar JSON value into a wanted value.
    ///
    /// Integers become [`FieldValue::Integer`] when they fit `i64`, else
    /// [`FieldValue::Unsigned`]. Returns `None` for null, arrays and objects.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::Unsigned(u))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Name of the value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Unsigned(_) => "unsigned",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Unsigned(u) => write!(f, "{u}u"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                Self::Integer(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                Self::Unsigned(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

/// Returns the records whose `field` equals `value` under same-type comparison.
///
/// Records that are not JSON objects, that lack `field`, or whose field has
/// a different type are excluded. Order is preserved. O(n).
#[must_use]
pub fn filter_equals(records: &[RawRecord], field: &str, value: &FieldValue) -> Vec<RawRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .as_object()
                .and_then(|object| object.get(field))
                .is_some_and(|stored| value.matches(stored))
        })
        .cloned()
        .collect()
}

/// Returns the typed records whose accessed field equals `value`.
///
/// The typed counterpart of [`filter_equals`]: the caller names the field
/// with an accessor, so no untyped lookup takes place. Order is preserved.
pub fn filter_by<T, V, F>(records: &[T], accessor: F, value: &V) -> Vec<T>
where
    T: Clone,
    V: PartialEq + ?Sized,
    F: Fn(&T) -> &V,
{
    records
        .iter()
        .filter(|record| accessor(*record) == value)
        .cloned()
        .collect()
}

/// Returns every record, unfiltered.
#[must_use]
pub fn all(records: Vec<RawRecord>) -> Vec<RawRecord> {
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn toys() -> Vec<RawRecord> {
        vec![
            json!({"id": "1", "name": "Teddy", "price": 12, "weight": 0.5, "soft": true}),
            json!({"id": "2", "name": "Car", "price": 30, "weight": 1.25, "soft": false}),
            json!({"id": "3", "name": "Ball", "price": 12, "weight": 0.5, "soft": true}),
        ]
    }

    fn ids(records: &[RawRecord]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn filter_by_string() {
        let records = toys();
        let found = filter_equals(&records, "name", &"Car".into());
        assert_eq!(ids(&found), vec!["2"]);
    }

    #[test]
    fn filter_by_integer_keeps_order() {
        let records = toys();
        let found = filter_equals(&records, "price", &12i64.into());
        assert_eq!(ids(&found), vec!["1", "3"]);
    }

    #[test]
    fn filter_by_unsigned() {
        let records = toys();
        let found = filter_equals(&records, "price", &30u32.into());
        assert_eq!(ids(&found), vec!["2"]);
    }

    #[test]
    fn filter_by_float() {
        let records = toys();
        let found = filter_equals(&records, "weight", &0.5f64.into());
        assert_eq!(ids(&found), vec!["1", "3"]);
    }

    #[test]
    fn filter_by_bool() {
        let records = toys();
        let found = filter_equals(&records, "soft", &false.into());
        assert_eq!(ids(&found), vec!["2"]);
    }

    #[test]
    fn type_mismatch_is_a_non_match() {
        let records = toys();
        assert!(filter_equals(&records, "price", &"12".into()).is_empty());
        assert!(filter_equals(&records, "name", &1i64.into()).is_empty());
        assert!(filter_equals(&records, "price", &12.0f64.into()).is_empty());
        assert!(filter_equals(&records, "weight", &0i64.into()).is_empty());
    }

    #[test]
    fn missing_field_is_a_non_match() {
        let records = toys();
        assert!(filter_equals(&records, "colour", &"red".into()).is_empty());
    }

    #[test]
    fn non_object_records_are_skipped() {
        let records = vec![json!("Car"), json!(null), json!({"name": "Car"})];
        let found = filter_equals(&records, "name", &"Car".into());
        assert_eq!(found, vec![json!({"name": "Car"})]);
    }

    #[test]
    fn negative_integers_do_not_match_unsigned() {
        let records = vec![json!({"n": -1})];
        assert_eq!(filter_equals(&records, "n", &(-1i64).into()).len(), 1);
        assert!(filter_equals(&records, "n", &FieldValue::Unsigned(u64::MAX)).is_empty());
    }

    #[test]
    fn filter_by_accessor() {
        #[derive(Clone, Debug, PartialEq)]
        struct Toy {
            name: String,
            price: u32,
        }

        let toys = vec![
            Toy { name: "Teddy".into(), price: 12 },
            Toy { name: "Car".into(), price: 30 },
            Toy { name: "Ball".into(), price: 12 },
        ];

        let cars = filter_by(&toys, |t| t.name.as_str(), "Car");
        assert_eq!(cars, vec![toys[1].clone()]);

        let cheap = filter_by(&toys, |t| &t.price, &12);
        assert_eq!(cheap.len(), 2);
        assert_eq!(cheap[1].name, "Ball");
    }

    #[test]
    fn all_is_pass_through() {
        let records = toys();
        assert_eq!(all(records.clone()), records);
    }

    #[test]
    fn from_json_scalars() {
        assert_eq!(FieldValue::from_json(&json!("x")), Some(FieldValue::from("x")));
        assert_eq!(FieldValue::from_json(&json!(-3)), Some(FieldValue::Integer(-3)));
        assert_eq!(
            FieldValue::from_json(&json!(u64::MAX)),
            Some(FieldValue::Unsigned(u64::MAX))
        );
        assert_eq!(FieldValue::from_json(&json!(1.5)), Some(FieldValue::Float(1.5)));
        assert_eq!(FieldValue::from_json(&json!(null)), None);
        assert_eq!(FieldValue::from_json(&json!([1])), None);
    }

    #[test]
    fn integer_value_matches_unsigned_storage() {
        let records = vec![json!({"n": 7u64})];
        let wanted = FieldValue::from_json(&json!(7)).unwrap();
        assert_eq!(filter_equals(&records, "n", &wanted).len(), 1);
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::from("Car").to_string(), "\"Car\"");
        assert_eq!(FieldValue::from(3u8).to_string(), "3u");
        assert_eq!(FieldValue::from(true).type_name(), "bool");
    }

    proptest! {
        #[test]
        fn filter_returns_exactly_the_equal_subset(
            values in prop::collection::vec(0i64..5, 0..40),
            wanted in 0i64..5,
        ) {
            let records: Vec<RawRecord> = values
                .iter()
                .enumerate()
                .map(|(i, v)| json!({"id": i.to_string(), "n": v}))
                .collect();

            let found = filter_equals(&records, "n", &FieldValue::Integer(wanted));
            let expected: Vec<RawRecord> = records
                .iter()
                .filter(|r| r["n"] == json!(wanted))
                .cloned()
                .collect();
            prop_assert_eq!(found, expected);
        }

        #[test]
        fn string_value_never_matches_numbers(values in prop::collection::vec(any::<i64>(), 0..20)) {
            let records: Vec<RawRecord> = values.iter().map(|v| json!({"n": v})).collect();
            for v in &values {
                let found = filter_equals(&records, "n", &FieldValue::String(v.to_string()));
                prop_assert!(found.is_empty());
            }
        }
    }
}
