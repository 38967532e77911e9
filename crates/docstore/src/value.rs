//! Runtime values produced by field accessors and carried by filter literals.
//!
//! [`Value`] is the common currency between records and filters: every field
//! accessor returns one, and every literal in a [`Filter`](crate::Filter) is
//! one. Nil-able fields that hold nothing are [`Value::Null`]; an empty
//! sequence is `Value::Array(vec![])`, which is *not* null.

use chrono::{DateTime, TimeZone, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::FilterError;
use crate::object_id::ObjectId;

/// A keyed container of values, used for nested records and maps.
pub type Document = BTreeMap<String, Value>;

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A nil-able value holding nothing.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer of any width.
    Int(i64),
    /// An unsigned integer of any width.
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// A point in time.
    Time(DateTime<Utc>),
    /// A document identity.
    ObjectId(ObjectId),
    /// An ordered, non-nil container.
    Array(Vec<Value>),
    /// A keyed container or nested record.
    Document(Document),
}

/// Runtime category of a [`Value`], as named by the `$type` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Floating point (`double` / `decimal`).
    Double,
    /// Text.
    String,
    /// Keyed container or nested record.
    Object,
    /// Ordered container.
    Array,
    /// Document identity.
    ObjectId,
    /// Boolean.
    Bool,
    /// Point in time.
    Date,
    /// Nil.
    Null,
    /// Signed or unsigned integer.
    Int,
}

impl Category {
    /// The `$type` alias of this category.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Double => "double",
            Category::String => "string",
            Category::Object => "object",
            Category::Array => "array",
            Category::ObjectId => "objectId",
            Category::Bool => "bool",
            Category::Date => "date",
            Category::Null => "null",
            Category::Int => "int",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for integer and floating point values.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Float(_))
    }

    /// The runtime category of this value.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Value::Null => Category::Null,
            Value::Bool(_) => Category::Bool,
            Value::Int(_) | Value::UInt(_) => Category::Int,
            Value::Float(_) => Category::Double,
            Value::String(_) => Category::String,
            Value::Time(_) => Category::Date,
            Value::ObjectId(_) => Category::ObjectId,
            Value::Array(_) => Category::Array,
            Value::Document(_) => Category::Object,
        }
    }

    /// Borrow the elements of an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the entries of a document value.
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Convert a JSON value.
    ///
    /// Numbers become [`Value::Int`] when they fit an `i64`, [`Value::UInt`]
    /// when they fit a `u64`, and [`Value::Float`] otherwise. The extended
    /// JSON wrappers `{"$date": ...}` and `{"$oid": ...}` become
    /// [`Value::Time`] and [`Value::ObjectId`].
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] when an extended JSON wrapper is malformed.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FilterError> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => number_from_json(n),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => {
                if let Some(wrapped) = extended_json(map)? {
                    return Ok(wrapped);
                }
                Value::Document(
                    map.iter()
                        .map(|(k, v)| Ok::<_, FilterError>((k.clone(), Value::from_json(v)?)))
                        .collect::<Result<_, _>>()?,
                )
            }
        })
    }

    /// Convert to JSON, using extended JSON wrappers for times and ids.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing a Value into serde_json::Value cannot fail: every key is a string.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub(crate) fn number_from_json(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else if let Some(u) = n.as_u64() {
        Value::UInt(u)
    } else {
        Value::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Recognize `{"$date": ...}` and `{"$oid": ...}`.
///
/// Returns `Ok(None)` for any other object.
pub(crate) fn extended_json(
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<Option<Value>, FilterError> {
    if map.len() != 1 {
        return Ok(None);
    }

    if let Some(date) = map.get("$date") {
        let time = match date {
            serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| FilterError::InvalidDate(format!("'{text}': {e}")))?,
            serde_json::Value::Number(n) => {
                let millis = n
                    .as_i64()
                    .ok_or_else(|| FilterError::InvalidDate(format!("{n} is not integral")))?;
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| FilterError::InvalidDate(format!("{millis} is out of range")))?
            }
            other => {
                return Err(FilterError::InvalidDate(format!(
                    "expected a string or number, got {other}"
                )));
            }
        };
        return Ok(Some(Value::Time(time)));
    }

    if let Some(oid) = map.get("$oid") {
        let serde_json::Value::String(text) = oid else {
            return Err(FilterError::InvalidObjectId(format!(
                "expected a string, got {oid}"
            )));
        };
        return Ok(Some(Value::ObjectId(ObjectId::parse_hex(text)?)));
    }

    Ok(None)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Time(t) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$date", &t.to_rfc3339())?;
                map.end()
            }
            Value::ObjectId(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$oid", &id.to_hex())?;
                map.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Document(doc) => {
                let mut map = serializer.serialize_map(Some(doc.len()))?;
                for (key, value) in doc {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

macro_rules! value_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

macro_rules! value_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(u64::from(v))
            }
        })*
    };
}

value_from_signed!(i8, i16, i32, i64);
value_from_unsigned!(u8, u16, u32, u64);

// Pointer-sized integers are at most 64 bits on every supported target.
impl From<isize> for Value {
    #[allow(clippy::cast_possible_truncation)]
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    #[allow(clippy::cast_possible_truncation)]
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(v: &[T]) -> Self {
        Value::Array(v.iter().cloned().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::null(json!(null), Category::Null)]
    #[case::int(json!(-4), Category::Int)]
    #[case::big_unsigned(json!(u64::MAX), Category::Int)]
    #[case::float(json!(1.5), Category::Double)]
    #[case::string(json!("x"), Category::String)]
    #[case::array(json!([1, 2]), Category::Array)]
    #[case::object(json!({"a": 1}), Category::Object)]
    #[case::date(json!({"$date": "2021-06-01T12:00:00Z"}), Category::Date)]
    #[case::oid(json!({"$oid": "0123456789abcdef01234567"}), Category::ObjectId)]
    fn test_from_json_categories(#[case] json: serde_json::Value, #[case] expected: Category) {
        assert_eq!(Value::from_json(&json).unwrap().category(), expected);
    }

    #[test]
    fn test_numbers_prefer_signed() {
        assert_eq!(Value::from_json(&json!(5)).unwrap(), Value::Int(5));
        assert_eq!(
            Value::from_json(&json!(u64::MAX)).unwrap(),
            Value::UInt(u64::MAX)
        );
    }

    #[test]
    fn test_date_from_epoch_millis() {
        let value = Value::from_json(&json!({"$date": 86_400_000})).unwrap();
        let Value::Time(t) = value else {
            panic!("expected a time, got {value:?}");
        };
        assert_eq!(t.timestamp(), 86_400);
    }

    #[test]
    fn test_malformed_wrappers_are_errors() {
        assert!(matches!(
            Value::from_json(&json!({"$date": "yesterday"})),
            Err(FilterError::InvalidDate(_))
        ));
        assert!(matches!(
            Value::from_json(&json!({"$oid": 12})),
            Err(FilterError::InvalidObjectId(_))
        ));
    }

    #[test]
    fn test_wrapper_with_extra_keys_is_a_document() {
        let value = Value::from_json(&json!({"$date": 1, "other": 2})).unwrap();
        assert_eq!(value.category(), Category::Object);
    }

    #[test]
    fn test_to_json_uses_extended_wrappers() {
        let id = ObjectId::from_bytes([1; 12]);
        let value = Value::Document(Document::from([
            ("_id".to_string(), Value::ObjectId(id)),
            ("tags".to_string(), Value::from(vec!["a", "b"])),
        ]));

        assert_eq!(
            value.to_json(),
            json!({"_id": {"$oid": "010101010101010101010101"}, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_option_and_vec_conversions() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3u8)), Value::UInt(3));
        assert_eq!(Value::from(Vec::<String>::new()), Value::Array(vec![]));
    }

    #[test]
    fn test_pointer_sized_conversions() {
        assert_eq!(Value::from(-7isize), Value::Int(-7));
        assert_eq!(Value::from(usize::MAX), Value::UInt(u64::MAX));
    }
}
