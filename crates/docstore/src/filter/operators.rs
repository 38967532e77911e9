//! The operator table.
//!
//! Every `$`-prefixed filter key is dispatched through an [`Operators`]
//! table. The standard table holds one handler per [`Operator`]; stores may
//! extend their own copy with custom tokens.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::compare::{compare_numbers, values_equal};
use super::eval::{Evaluator, Scope};
use super::{Filter, Operand, OPERATOR_PREFIX};
use crate::error::{EvalError, RegistrationError};
use crate::value::{Category, Value};

/// Signature of an operator handler.
///
/// A handler receives the evaluator (for recursing into nested filters), the
/// operand written after the operator key, and the value in scope.
pub type OperatorFn = fn(&Evaluator<'_>, &Operand, Scope<'_>) -> Result<bool, EvalError>;

/// The built-in operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `$eq`: deep equality.
    Eq,
    /// `$ne`: negated equality.
    Ne,
    /// `$not`: negated equality, or negated nested filter.
    Not,
    /// `$gt`: strictly greater.
    Gt,
    /// `$gte`: greater or equal.
    Gte,
    /// `$lt`: strictly less.
    Lt,
    /// `$lte`: less or equal.
    Lte,
    /// `$or`: some nested filter matches.
    Or,
    /// `$and`: every nested filter matches.
    And,
    /// `$size`: array length.
    Size,
    /// `$type`: runtime category.
    Type,
    /// `$in`: equal to some listed value.
    In,
    /// `$nin`: equal to no listed value.
    Nin,
}

impl Operator {
    /// Every built-in operator, in table order.
    pub const ALL: [Operator; 13] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Not,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Or,
        Operator::And,
        Operator::Size,
        Operator::Type,
        Operator::In,
        Operator::Nin,
    ];

    /// The filter key of this operator.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Not => "$not",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::Or => "$or",
            Operator::And => "$and",
            Operator::Size => "$size",
            Operator::Type => "$type",
            Operator::In => "$in",
            Operator::Nin => "$nin",
        }
    }

    /// The handler implementing this operator.
    #[must_use]
    pub fn handler(self) -> OperatorFn {
        match self {
            Operator::Eq => eq,
            Operator::Ne | Operator::Not => ne,
            Operator::Gt => gt,
            Operator::Gte => gte,
            Operator::Lt => lt,
            Operator::Lte => lte,
            Operator::Or => or,
            Operator::And => and,
            Operator::Size => size,
            Operator::Type => type_of,
            Operator::In => is_in,
            Operator::Nin => not_in,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.token() == s)
            .ok_or_else(|| EvalError::UnknownOperator(s.to_string()))
    }
}

/// Operator dispatch table keyed by token.
#[derive(Clone)]
pub struct Operators {
    table: HashMap<String, OperatorFn>,
}

static STANDARD: LazyLock<Operators> = LazyLock::new(Operators::standard);

impl Operators {
    /// A table holding every built-in [`Operator`].
    #[must_use]
    pub fn standard() -> Self {
        let table = Operator::ALL
            .into_iter()
            .map(|op| (op.token().to_string(), op.handler()))
            .collect();
        Self { table }
    }

    /// A shared, process-wide standard table.
    #[must_use]
    pub fn standard_ref() -> &'static Self {
        &STANDARD
    }

    /// A table with no operators at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Add or replace the handler for `token`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidOperatorToken`] unless the token
    /// is `$` followed by at least one character.
    pub fn register(
        &mut self,
        token: impl Into<String>,
        handler: OperatorFn,
    ) -> Result<Option<OperatorFn>, RegistrationError> {
        let token = token.into();
        if !token.starts_with(OPERATOR_PREFIX) || token.len() < 2 {
            return Err(RegistrationError::InvalidOperatorToken(token));
        }
        Ok(self.table.insert(token, handler))
    }

    /// The handler for `token`.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<OperatorFn> {
        self.table.get(token).copied()
    }

    /// Returns `true` when `token` has a handler.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.table.contains_key(token)
    }

    /// Check that every operator token in `filter` has a handler.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownOperator`] for the first unknown token,
    /// in filter order.
    pub fn validate(&self, filter: &Filter) -> Result<(), EvalError> {
        let unknown = filter
            .operators()
            .into_iter()
            .find(|t| !self.contains(t));
        match unknown {
            Some(token) => Err(EvalError::UnknownOperator(token.to_string())),
            None => Ok(()),
        }
    }

    /// Registered tokens, sorted.
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.table.keys().map(String::as_str).collect();
        tokens.sort_unstable();
        tokens
    }
}

impl Default for Operators {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Operators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operators")
            .field("tokens", &self.tokens())
            .finish()
    }
}

fn eq(ev: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    if let Operand::Filter(filter) = operand
        && filter.has_operators()
    {
        return ev.descend()?.matches(filter, scope);
    }
    Ok(values_equal(&operand.to_value(), &scope.value()))
}

fn ne(ev: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    eq(ev, operand, scope).map(|matched| !matched)
}

fn compare(
    op: Operator,
    operand: &Operand,
    scope: Scope<'_>,
    accept: fn(Ordering) -> bool,
) -> Result<bool, EvalError> {
    let subject = scope.value();
    match operand {
        Operand::Value(Value::Time(bound)) => {
            Ok(matches!(&*subject, Value::Time(time) if accept(time.cmp(bound))))
        }
        Operand::Value(bound) if bound.is_number() => {
            Ok(compare_numbers(&subject, bound).is_some_and(accept))
        }
        other => Err(EvalError::InvalidArgument {
            operator: op.token(),
            expected: "a number or a date",
            found: other.describe(),
        }),
    }
}

fn gt(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    compare(Operator::Gt, operand, scope, Ordering::is_gt)
}

fn gte(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    compare(Operator::Gte, operand, scope, Ordering::is_ge)
}

fn lt(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    compare(Operator::Lt, operand, scope, Ordering::is_lt)
}

fn lte(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    compare(Operator::Lte, operand, scope, Ordering::is_le)
}

fn or(ev: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    let Operand::List(items) = operand else {
        return Ok(false);
    };
    let inner = ev.descend()?;
    for filter in items.iter().filter_map(Operand::as_filter) {
        if inner.matches(filter, scope)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn and(ev: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    let Operand::List(items) = operand else {
        return Ok(false);
    };
    let inner = ev.descend()?;
    for filter in items.iter().filter_map(Operand::as_filter) {
        if !inner.matches(filter, scope)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn size(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    let expected = match operand {
        Operand::Value(Value::Int(n)) => usize::try_from(*n).ok(),
        Operand::Value(Value::UInt(n)) => usize::try_from(*n).ok(),
        _ => None,
    }
    .ok_or_else(|| EvalError::InvalidArgument {
        operator: Operator::Size.token(),
        expected: "a non-negative integer",
        found: operand.describe(),
    })?;

    let Scope::Value(Value::Array(items)) = scope else {
        return Ok(false);
    };
    Ok(items.len() == expected)
}

/// Categories accepted by one `$type` alias or numeric code.
fn type_alias(name: &str) -> &'static [Category] {
    match name {
        "double" | "decimal" => &[Category::Double],
        "string" => &[Category::String],
        "object" => &[Category::Object],
        "array" => &[Category::Array],
        "objectId" => &[Category::ObjectId],
        "bool" => &[Category::Bool],
        "date" => &[Category::Date],
        "null" => &[Category::Null],
        "int" | "long" => &[Category::Int],
        "number" => &[Category::Int, Category::Double],
        _ => &[],
    }
}

fn type_code(code: i128) -> &'static [Category] {
    match code {
        1 | 19 => &[Category::Double],
        2 => &[Category::String],
        3 => &[Category::Object],
        4 => &[Category::Array],
        7 => &[Category::ObjectId],
        8 => &[Category::Bool],
        9 => &[Category::Date],
        10 => &[Category::Null],
        16 | 18 => &[Category::Int],
        _ => &[],
    }
}

fn type_categories(operand: &Operand) -> Option<&'static [Category]> {
    match operand {
        Operand::Value(Value::String(alias)) => Some(type_alias(alias)),
        Operand::Value(Value::Int(code)) => Some(type_code(i128::from(*code))),
        Operand::Value(Value::UInt(code)) => Some(type_code(i128::from(*code))),
        _ => None,
    }
}

fn type_of(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    let invalid = || EvalError::InvalidArgument {
        operator: Operator::Type.token(),
        expected: "a type alias, a type code, or a list of them",
        found: operand.describe(),
    };

    let category = scope.category();
    let accepts = |item: &Operand| -> Result<bool, EvalError> {
        let categories = type_categories(item).ok_or_else(invalid)?;
        Ok(categories.contains(&category))
    };

    match operand {
        Operand::List(items) => {
            let mut matched = false;
            for item in items {
                matched |= accepts(item)?;
            }
            Ok(matched)
        }
        single => accepts(single),
    }
}

fn membership(op: Operator, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    let subject = scope.value();
    match operand {
        Operand::List(items) => Ok(items
            .iter()
            .any(|item| values_equal(&item.to_value(), &subject))),
        Operand::Value(Value::Array(items)) => {
            Ok(items.iter().any(|item| values_equal(item, &subject)))
        }
        other => Err(EvalError::InvalidArgument {
            operator: op.token(),
            expected: "an array",
            found: other.describe(),
        }),
    }
}

fn is_in(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    membership(Operator::In, operand, scope)
}

fn not_in(_: &Evaluator<'_>, operand: &Operand, scope: Scope<'_>) -> Result<bool, EvalError> {
    membership(Operator::Nin, operand, scope).map(|found| !found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::filter::Filter;
    use rstest::rstest;
    use serde_json::json;

    fn check(filter: serde_json::Value, doc: serde_json::Value) -> Result<bool, EvalError> {
        let filter = Filter::from_json(&filter).unwrap();
        let doc = Value::from_json(&doc).unwrap();
        filter.matches_value(&doc)
    }

    fn profile() -> serde_json::Value {
        json!({
            "name": "acme",
            "age": 42,
            "score": 2.5,
            "active": true,
            "domains": ["a.com", "b.com"],
            "aliases": null,
            "tags": [],
            "created": {"$date": "2021-06-01T00:00:00Z"},
            "onMatch": {"sendMail": ["ops@acme.com"]},
        })
    }

    #[rstest]
    #[case::eq_literal(json!({"name": {"$eq": "acme"}}), true)]
    #[case::eq_mismatch(json!({"name": {"$eq": "other"}}), false)]
    #[case::eq_string_vs_number(json!({"age": {"$eq": "42"}}), false)]
    #[case::eq_array(json!({"domains": {"$eq": ["a.com", "b.com"]}}), true)]
    #[case::eq_nested_document(json!({"onMatch": {"$eq": {"sendMail": ["ops@acme.com"]}}}), true)]
    #[case::ne(json!({"name": {"$ne": "other"}}), true)]
    #[case::not_size(json!({"domains": {"$not": {"$size": 0}}}), true)]
    #[case::not_size_empty(json!({"tags": {"$not": {"$size": 0}}}), false)]
    #[case::gt(json!({"age": {"$gt": 41}}), true)]
    #[case::gt_equal(json!({"age": {"$gt": 42}}), false)]
    #[case::gte_float(json!({"age": {"$gte": 41.5}}), true)]
    #[case::lt_float_subject(json!({"score": {"$lt": 3}}), true)]
    #[case::lte(json!({"score": {"$lte": 2.5}}), true)]
    #[case::compare_non_numeric_subject(json!({"name": {"$gt": 1}}), false)]
    #[case::compare_null_subject(json!({"aliases": {"$lt": 1}}), false)]
    #[case::date_after(json!({"created": {"$gt": {"$date": "2021-01-01T00:00:00Z"}}}), true)]
    #[case::date_before(json!({"created": {"$lt": {"$date": "2021-01-01T00:00:00Z"}}}), false)]
    #[case::date_vs_number(json!({"age": {"$gt": {"$date": "2021-01-01T00:00:00Z"}}}), false)]
    #[case::or_some(json!({"$or": [{"name": "x"}, {"age": 42}]}), true)]
    #[case::or_none(json!({"$or": [{"name": "x"}, {"age": 1}]}), false)]
    #[case::or_empty(json!({"$or": []}), false)]
    #[case::or_not_a_list(json!({"$or": {"name": "acme"}}), false)]
    #[case::or_skips_scalars(json!({"$or": [1, {"name": "acme"}]}), true)]
    #[case::and_all(json!({"$and": [{"name": "acme"}, {"age": 42}]}), true)]
    #[case::and_one_fails(json!({"$and": [{"name": "acme"}, {"age": 1}]}), false)]
    #[case::and_empty(json!({"$and": []}), true)]
    #[case::and_not_a_list(json!({"$and": "x"}), false)]
    #[case::size(json!({"domains": {"$size": 2}}), true)]
    #[case::size_wrong(json!({"domains": {"$size": 1}}), false)]
    #[case::size_empty(json!({"tags": {"$size": 0}}), true)]
    #[case::size_null_never_matches(json!({"aliases": {"$size": 0}}), false)]
    #[case::size_missing_never_matches(json!({"nothing": {"$size": 0}}), false)]
    #[case::type_string(json!({"name": {"$type": "string"}}), true)]
    #[case::type_code(json!({"name": {"$type": 2}}), true)]
    #[case::type_int(json!({"age": {"$type": "int"}}), true)]
    #[case::type_long(json!({"age": {"$type": 18}}), true)]
    #[case::type_number(json!({"score": {"$type": "number"}}), true)]
    #[case::type_decimal(json!({"score": {"$type": "decimal"}}), true)]
    #[case::type_null(json!({"aliases": {"$type": "null"}}), true)]
    #[case::type_date(json!({"created": {"$type": "date"}}), true)]
    #[case::type_object(json!({"onMatch": {"$type": 3}}), true)]
    #[case::type_array(json!({"tags": {"$type": "array"}}), true)]
    #[case::type_mismatch(json!({"name": {"$type": "bool"}}), false)]
    #[case::type_unknown_alias(json!({"name": {"$type": "varchar"}}), false)]
    #[case::type_unknown_code(json!({"name": {"$type": 99}}), false)]
    #[case::type_list(json!({"age": {"$type": ["string", "int"]}}), true)]
    #[case::in_list(json!({"name": {"$in": ["x", "acme"]}}), true)]
    #[case::in_numeric(json!({"age": {"$in": [42.0]}}), true)]
    #[case::in_missing(json!({"name": {"$in": ["x"]}}), false)]
    #[case::nin(json!({"name": {"$nin": ["x", "y"]}}), true)]
    #[case::nin_present(json!({"name": {"$nin": ["acme"]}}), false)]
    fn test_operator(#[case] filter: serde_json::Value, #[case] expected: bool) {
        assert_eq!(check(filter, profile()), Ok(expected));
    }

    #[rstest]
    #[case::gt_string(json!({"age": {"$gt": "1"}}), "$gt")]
    #[case::lte_bool(json!({"age": {"$lte": true}}), "$lte")]
    #[case::gt_null(json!({"age": {"$gt": null}}), "$gt")]
    #[case::size_negative(json!({"domains": {"$size": -1}}), "$size")]
    #[case::size_float(json!({"domains": {"$size": 1.5}}), "$size")]
    #[case::size_string(json!({"domains": {"$size": "2"}}), "$size")]
    #[case::type_float(json!({"name": {"$type": 2.0}}), "$type")]
    #[case::type_bool(json!({"name": {"$type": true}}), "$type")]
    #[case::in_scalar(json!({"name": {"$in": "acme"}}), "$in")]
    #[case::nin_scalar(json!({"name": {"$nin": 3}}), "$nin")]
    fn test_invalid_argument(#[case] filter: serde_json::Value, #[case] token: &str) {
        match check(filter, profile()) {
            Err(EvalError::InvalidArgument { operator, .. }) => assert_eq!(operator, token),
            other => panic!("expected InvalidArgument for {token}, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_operator() {
        assert_eq!(
            check(json!({"name": {"$regex": "a.*"}}), profile()),
            Err(EvalError::UnknownOperator("$regex".to_string()))
        );
    }

    #[test]
    fn test_validate_finds_unknown_tokens_without_a_record() {
        let operators = Operators::standard();
        let filter = Filter::from_json(&json!({
            "$or": [{"age": {"$gt": 1}}, {"name": {"$regex": "a"}}],
            "tags": {"$where": "x"},
        }))
        .unwrap();

        assert_eq!(
            operators.validate(&filter),
            Err(EvalError::UnknownOperator("$regex".to_string()))
        );
        assert_eq!(
            operators.validate(&Filter::from_json(&json!({"age": {"$gt": 1}})).unwrap()),
            Ok(())
        );
    }

    #[test]
    fn test_operator_tokens_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.token().parse::<Operator>(), Ok(op));
            assert_eq!(op.to_string(), op.token());
        }
        assert!("$where".parse::<Operator>().is_err());
    }

    #[test]
    fn test_standard_table_covers_every_operator() {
        let table = Operators::standard();
        for op in Operator::ALL {
            assert!(table.contains(op.token()), "missing {op}");
        }
        assert_eq!(table.tokens().len(), Operator::ALL.len());
        assert!(Operators::empty().tokens().is_empty());
    }

    fn starts_with(
        _: &Evaluator<'_>,
        operand: &Operand,
        scope: Scope<'_>,
    ) -> Result<bool, EvalError> {
        match (operand, &*scope.value()) {
            (Operand::Value(Value::String(prefix)), Value::String(subject)) => {
                Ok(subject.starts_with(prefix.as_str()))
            }
            _ => Ok(false),
        }
    }

    #[test]
    fn test_custom_operator() {
        let mut table = Operators::standard();
        let previous = table.register("$startsWith", starts_with).unwrap();
        assert!(previous.is_none());

        let config = StoreConfig::default();
        let evaluator = Evaluator::new(&table, &config);
        let doc = Value::from_json(&profile()).unwrap();

        let hit = Filter::from_json(&json!({"name": {"$startsWith": "ac"}})).unwrap();
        let miss = Filter::from_json(&json!({"name": {"$startsWith": "zz"}})).unwrap();

        assert_eq!(evaluator.matches(&hit, Scope::Value(&doc)), Ok(true));
        assert_eq!(evaluator.matches(&miss, Scope::Value(&doc)), Ok(false));
    }

    #[rstest]
    #[case::no_prefix("startsWith")]
    #[case::bare_prefix("$")]
    #[case::empty("")]
    fn test_register_rejects_bad_tokens(#[case] token: &str) {
        let mut table = Operators::empty();
        assert!(matches!(
            table.register(token, starts_with),
            Err(RegistrationError::InvalidOperatorToken(rejected)) if rejected == token
        ));
    }

    #[test]
    fn test_register_replaces_existing_handler() {
        let mut table = Operators::standard();
        let previous = table.register("$eq", starts_with).unwrap();
        assert!(previous.is_some());
    }
}
