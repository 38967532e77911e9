//! Filter evaluation against records and values.
//!
//! Evaluation walks the filter's entries in order and AND-combines them,
//! stopping at the first entry that fails. Each entry is applied to the
//! *value in scope*: the whole record at the top level, or a field's value
//! once a field key has been followed.

use std::borrow::Cow;

use super::operators::Operators;
use super::{compare::values_equal, is_operator, Filter, Operand};
use crate::config::{StoreConfig, UnknownFieldPolicy};
use crate::error::EvalError;
use crate::value::{Category, Value};

/// Field access for a record under evaluation.
///
/// Implemented for records bound to their [`FieldMap`](crate::FieldMap).
pub trait Fields {
    /// Rust type name of the record kind, for error messages.
    fn kind(&self) -> &'static str;

    /// The value behind an external field name, or `None` if the name does
    /// not resolve on this kind.
    fn field(&self, name: &str) -> Option<Value>;

    /// The whole record as a document.
    fn to_value(&self) -> Value;
}

/// What an operator is applied to.
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    /// A whole record, read through its field map.
    Record(&'a dyn Fields),
    /// A plain value: a resolved field, or a standalone document.
    Value(&'a Value),
}

impl<'a> Scope<'a> {
    /// The value in scope. Records are materialized as documents.
    #[must_use]
    pub fn value(&self) -> Cow<'a, Value> {
        match *self {
            Scope::Record(record) => Cow::Owned(record.to_value()),
            Scope::Value(value) => Cow::Borrowed(value),
        }
    }

    /// Runtime category of the value in scope, without materializing records.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Scope::Record(_) => Category::Object,
            Scope::Value(value) => value.category(),
        }
    }
}

/// Evaluates filters with one operator table and configuration.
///
/// An evaluator is cheap to copy; [`Evaluator::descend`] hands out a copy one
/// level deeper so nesting can be bounded.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    operators: &'a Operators,
    unknown_fields: UnknownFieldPolicy,
    max_depth: usize,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator at nesting depth zero.
    #[must_use]
    pub fn new(operators: &'a Operators, config: &StoreConfig) -> Self {
        Self {
            operators,
            unknown_fields: config.unknown_fields,
            max_depth: config.max_filter_depth,
            depth: 0,
        }
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// An evaluator one nesting level deeper.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::TooDeep`] once the configured depth is exceeded.
    pub fn descend(&self) -> Result<Self, EvalError> {
        if self.depth >= self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }

    /// Decide whether the value in scope satisfies `filter`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] for unknown operators, malformed operator
    /// arguments, unknown fields under [`UnknownFieldPolicy::Error`], or
    /// excessive nesting.
    pub fn matches(&self, filter: &Filter, scope: Scope<'_>) -> Result<bool, EvalError> {
        for (key, operand) in filter.iter() {
            let satisfied = if is_operator(key) {
                self.apply_operator(key, operand, scope)?
            } else {
                self.match_field(key, operand, scope)?
            };

            if !satisfied {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Decide whether the value in scope satisfies every filter, in order.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::matches`].
    pub fn matches_all(&self, filters: &[&Filter], scope: Scope<'_>) -> Result<bool, EvalError> {
        for filter in filters {
            if !self.matches(filter, scope)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply_operator(
        &self,
        token: &str,
        operand: &Operand,
        scope: Scope<'_>,
    ) -> Result<bool, EvalError> {
        let handler = self
            .operators
            .get(token)
            .ok_or_else(|| EvalError::UnknownOperator(token.to_string()))?;
        handler(self, operand, scope)
    }

    fn match_field(
        &self,
        key: &str,
        operand: &Operand,
        scope: Scope<'_>,
    ) -> Result<bool, EvalError> {
        let value = match scope {
            Scope::Record(record) => match record.field(key) {
                Some(value) => value,
                None => {
                    return match self.unknown_fields {
                        UnknownFieldPolicy::NoMatch => Ok(false),
                        UnknownFieldPolicy::Error => Err(EvalError::UnknownField {
                            field: key.to_string(),
                            kind: record.kind(),
                        }),
                    };
                }
            },
            Scope::Value(Value::Document(doc)) => doc.get(key).cloned().unwrap_or(Value::Null),
            Scope::Value(_) => return Ok(false),
        };

        match operand {
            Operand::Filter(sub) => self.descend()?.matches(sub, Scope::Value(&value)),
            Operand::Value(Value::Null) => Ok(value.is_null()),
            literal => {
                let expected = literal.to_value();
                Ok(!value.is_null() && values_equal(&expected, &value))
            }
        }
    }
}
