//! Filter expressions in the shape of MongoDB filter documents.
//!
//! A [`Filter`] is an ordered list of `key → operand` pairs. Keys starting
//! with [`OPERATOR_PREFIX`] are operators (`$gt`, `$or`, ...); every other key
//! names a field. Operands are literal [`Value`]s, nested filters, or lists.
//!
//! Filters are usually written as JSON:
//!
//! ```
//! use docstore::Filter;
//!
//! let filter: Filter = r#"{"active": true, "age": {"$gte": 18}}"#.parse().unwrap();
//! assert_eq!(filter.len(), 2);
//! ```
//!
//! or assembled in code:
//!
//! ```
//! use docstore::Filter;
//!
//! let filter = Filter::new()
//!     .with("active", true)
//!     .with("age", Filter::new().with("$gte", 18));
//! assert!(!filter.has_operators());
//! ```
//!
//! Evaluation lives in [`Evaluator`]; the operator table in [`Operators`].

mod compare;
mod eval;
mod operators;

pub use compare::{compare_numbers, values_equal};
pub use eval::{Evaluator, Fields, Scope};
pub use operators::{Operator, OperatorFn, Operators};

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::config::StoreConfig;
use crate::error::{EvalError, FilterError};
use crate::object_id::ObjectId;
use crate::value::{extended_json, Document, Value};

/// Leading character of every operator key.
pub const OPERATOR_PREFIX: char = '$';

/// Returns `true` when `key` names an operator rather than a field.
#[must_use]
pub fn is_operator(key: &str) -> bool {
    key.starts_with(OPERATOR_PREFIX)
}

/// The right-hand side of one filter entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal value.
    Value(Value),
    /// A nested filter expression.
    Filter(Filter),
    /// An ordered sequence of operands.
    List(Vec<Operand>),
}

impl Operand {
    /// Borrow the nested filter, if this operand is one.
    #[must_use]
    pub fn as_filter(&self) -> Option<&Filter> {
        match self {
            Operand::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    /// Read this operand as a literal.
    ///
    /// Nested filters become documents and lists become arrays.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Operand::Value(value) => value.clone(),
            Operand::Filter(filter) => Value::Document(
                filter
                    .iter()
                    .map(|(key, operand)| (key.to_string(), operand.to_value()))
                    .collect::<Document>(),
            ),
            Operand::List(items) => Value::Array(items.iter().map(Operand::to_value).collect()),
        }
    }

    /// A short name for the operand's category, used in error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Operand::Value(value) => value.category().name(),
            Operand::Filter(_) => "a filter",
            Operand::List(_) => "a list",
        }
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, FilterError> {
        match json {
            serde_json::Value::Object(map) => match extended_json(map)? {
                Some(literal) => Ok(Operand::Value(literal)),
                None => Ok(Operand::Filter(Filter::from_map(map)?)),
            },
            serde_json::Value::Array(items) => Ok(Operand::List(
                items
                    .iter()
                    .map(Operand::from_json)
                    .collect::<Result<_, _>>()?,
            )),
            scalar => Ok(Operand::Value(Value::from_json(scalar)?)),
        }
    }

    fn collect_operators<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Operand::Value(_) => {}
            Operand::Filter(filter) => filter.collect_operators(out),
            Operand::List(items) => {
                for item in items {
                    item.collect_operators(out);
                }
            }
        }
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Operand::Value(value) => value.serialize(serializer),
            Operand::Filter(filter) => filter.serialize(serializer),
            Operand::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

macro_rules! operand_from_literal {
    ($($t:ty),*) => {
        $(impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Operand::Value(Value::from(v))
            }
        })*
    };
}

operand_from_literal!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f64,
    bool,
    &str,
    String,
    DateTime<Utc>,
    ObjectId
);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Filter> for Operand {
    fn from(v: Filter) -> Self {
        Operand::Filter(v)
    }
}

impl From<Vec<Filter>> for Operand {
    fn from(v: Vec<Filter>) -> Self {
        Operand::List(v.into_iter().map(Operand::Filter).collect())
    }
}

impl From<Vec<Operand>> for Operand {
    fn from(v: Vec<Operand>) -> Self {
        Operand::List(v)
    }
}

/// An ordered, immutable-by-convention filter expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    entries: Vec<(String, Operand)>,
}

impl Filter {
    /// An empty filter, which matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return the filter, for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(key, operand);
        self
    }

    /// Append an entry.
    pub fn push(&mut self, key: impl Into<String>, operand: impl Into<Operand>) {
        self.entries.push((key.into(), operand.into()));
    }

    /// `{"$and": [filters...]}`.
    #[must_use]
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::new().with("$and", filters.into_iter().collect::<Vec<_>>())
    }

    /// `{"$or": [filters...]}`.
    #[must_use]
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::new().with("$or", filters.into_iter().collect::<Vec<_>>())
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for the empty filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Operand)> {
        self.entries
            .iter()
            .map(|(key, operand)| (key.as_str(), operand))
    }

    /// Returns `true` when any top-level key is an operator.
    #[must_use]
    pub fn has_operators(&self) -> bool {
        self.entries.iter().any(|(key, _)| is_operator(key))
    }

    /// Every operator token used anywhere in the filter, first use first.
    #[must_use]
    pub fn operators(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_operators(&mut out);
        out
    }

    fn collect_operators<'a>(&'a self, out: &mut Vec<&'a str>) {
        for (key, operand) in &self.entries {
            if is_operator(key) && !out.contains(&key.as_str()) {
                out.push(key);
            }
            operand.collect_operators(out);
        }
    }

    /// Build a filter from a JSON object.
    ///
    /// JSON `null` is accepted as the empty filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::NotAnObject`] for any other non-object value,
    /// or an error for a malformed `$date`/`$oid` wrapper.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FilterError> {
        match json {
            serde_json::Value::Null => Ok(Self::new()),
            serde_json::Value::Object(map) => Self::from_map(map),
            other => Err(FilterError::NotAnObject(
                Value::from_json(other)?.category().name(),
            )),
        }
    }

    fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self, FilterError> {
        let entries = map
            .iter()
            .map(|(key, value)| Ok::<_, FilterError>((key.clone(), Operand::from_json(value)?)))
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }

    /// The JSON form of this filter.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        // Keys are always strings, so this conversion cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Evaluate against a plain value with the standard operators and default settings.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] for unknown operators or malformed arguments.
    pub fn matches_value(&self, value: &Value) -> Result<bool, EvalError> {
        let config = StoreConfig::default();
        Evaluator::new(Operators::standard_ref(), &config).matches(self, Scope::Value(value))
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let json: serde_json::Value =
            serde_json::from_str(s).map_err(|e| FilterError::Syntax(e.to_string()))?;
        Self::from_json(&json)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, operand) in &self.entries {
            map.serialize_entry(key, operand)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&json).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_preserves_key_order() {
        let filter: Filter = r#"{"z": 1, "a": 2, "$or": []}"#.parse().unwrap();
        let keys: Vec<&str> = filter.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a", "$or"]);
    }

    #[test]
    fn test_parse_operand_shapes() {
        let filter = Filter::from_json(&json!({
            "name": "x",
            "age": {"$gt": 3},
            "$or": [{"a": 1}, {"b": 2}],
            "seen": {"$date": "2020-01-01T00:00:00Z"},
        }))
        .unwrap();

        let operands: Vec<&Operand> = filter.iter().map(|(_, o)| o).collect();
        assert!(matches!(operands[0], Operand::Value(Value::String(_))));
        assert!(matches!(operands[1], Operand::Filter(_)));
        assert!(matches!(operands[2], Operand::List(items) if items.len() == 2));
        assert!(matches!(operands[3], Operand::Value(Value::Time(_))));
    }

    #[test]
    fn test_null_is_the_empty_filter() {
        assert!(Filter::from_json(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(
            Filter::from_json(&json!([1, 2])),
            Err(FilterError::NotAnObject("array"))
        );
        assert!(matches!(
            "{not json".parse::<Filter>(),
            Err(FilterError::Syntax(_))
        ));
    }

    #[test]
    fn test_non_hex_object_id_is_rejected() {
        let parsed = Filter::from_json(&json!({"_id": {"$oid": "+a+a+a+a+a+a+a+a+a+a+a+a"}}));
        assert!(matches!(parsed, Err(FilterError::InvalidObjectId(_))));
    }

    #[test]
    fn test_json_form_is_stable() {
        let json = json!({"active": true, "$or": [{"age": {"$lt": 5}}, {"tags": {"$size": 0}}]});
        let filter = Filter::from_json(&json).unwrap();
        assert_eq!(filter.to_json(), json);
    }

    #[test]
    fn test_builder_matches_parsed_form() {
        let built = Filter::new()
            .with("active", true)
            .with("age", Filter::new().with("$gte", 18));
        let parsed: Filter = r#"{"active": true, "age": {"$gte": 18}}"#.parse().unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_operators_are_collected_recursively() {
        let filter = Filter::from_json(&json!({
            "$or": [{"a": {"$gt": 1}}, {"b": {"$not": {"$size": 0}, "$type": "array"}}],
            "c": {"$gt": 2},
        }))
        .unwrap();
        assert_eq!(filter.operators(), ["$or", "$gt", "$not", "$size", "$type"]);
    }

    #[test]
    fn test_operand_to_value() {
        let operand = Operand::from(vec![Filter::new().with("a", 1)]);
        assert_eq!(
            operand.to_value(),
            Value::Array(vec![Value::Document(Document::from([(
                "a".to_string(),
                Value::Int(1)
            )]))])
        );
    }
}
