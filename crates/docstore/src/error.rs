//! Error types for docstore operations.
//!
//! Errors are split by the phase that raises them:
//!
//! - [`RegistrationError`]: a record kind cannot be schematized. Raised while
//!   registering kinds at startup and treated as fatal by callers.
//! - [`EvalError`]: a filter is malformed for the query being run. Scoped to
//!   that single query.
//! - [`FilterError`]: a JSON filter literal could not be parsed.
//! - [`ConfigError`]: the store configuration could not be loaded.
//!
//! All of them convert into the crate-level [`Error`], which also carries the
//! distinguished [`Error::NotFound`] outcome.

use std::io;
use thiserror::Error;

/// A record kind could not be turned into a field map, or a store-level
/// registration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The kind's schema declares no fields at all.
    #[error("{kind} is not a structured record: its schema declares no fields")]
    EmptySchema {
        /// Rust type name of the offending kind.
        kind: &'static str,
    },

    /// Two fields resolve to the same external name.
    #[error("{kind}: external field name '{name}' is used by both {first} and {second}")]
    DuplicateField {
        /// Rust type name of the offending kind.
        kind: &'static str,
        /// The colliding external name.
        name: String,
        /// Location of the field that claimed the name first.
        first: String,
        /// Location of the field that collided with it.
        second: String,
    },

    /// An external field name is empty or starts with the operator sentinel.
    #[error("{kind}: invalid external field name '{name}': {reason}")]
    InvalidFieldName {
        /// Rust type name of the offending kind.
        kind: &'static str,
        /// The rejected name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// Another kind already owns the collection name.
    #[error("collection '{collection}' is already bound to {existing}, cannot bind {kind}")]
    CollectionNameTaken {
        /// The contested collection name.
        collection: &'static str,
        /// Rust type name of the kind that owns the collection.
        existing: &'static str,
        /// Rust type name of the kind that tried to claim it.
        kind: &'static str,
    },

    /// A custom operator token does not start with the `$` sentinel.
    #[error("operator token '{0}' must start with '$'")]
    InvalidOperatorToken(String),
}

/// A filter could not be evaluated.
///
/// These never escape the query that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The filter uses an operator token that is not in the operator table.
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// An operator received an argument of the wrong category.
    #[error("{operator} expects {expected}, got {found}")]
    InvalidArgument {
        /// Operator token, e.g. `$size`.
        operator: &'static str,
        /// Description of the accepted argument.
        expected: &'static str,
        /// Category of the argument that was supplied.
        found: &'static str,
    },

    /// A field name does not resolve on the record kind being queried.
    ///
    /// Only raised under [`UnknownFieldPolicy::Error`](crate::config::UnknownFieldPolicy::Error).
    #[error("unknown field '{field}' on {kind}")]
    UnknownField {
        /// The unresolvable external name.
        field: String,
        /// Rust type name of the record kind.
        kind: &'static str,
    },

    /// The filter nests deeper than the configured limit.
    #[error("filter nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
}

/// A JSON filter literal could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The top-level filter is not a JSON object.
    #[error("a filter must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A `{"$date": ...}` wrapper could not be parsed.
    #[error("invalid $date literal: {0}")]
    InvalidDate(String),

    /// A `{"$oid": ...}` wrapper could not be parsed.
    #[error("invalid $oid literal: {0}")]
    InvalidObjectId(String),

    /// The filter text is not valid JSON.
    #[error("invalid filter JSON: {0}")]
    Syntax(String),
}

/// The store configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The configuration is not valid YAML for [`StoreConfig`](crate::config::StoreConfig).
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// A value parsed but is out of range.
    #[error("invalid configuration value for {key}: {reason}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// The error type for store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Registering a record kind failed.
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// No record matched.
    #[error("no document found in collection '{collection}'")]
    NotFound {
        /// The collection that was searched.
        collection: &'static str,
    },

    /// The query's filter could not be evaluated.
    #[error("filter evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    /// A filter literal could not be parsed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns `true` for the distinguished "no matching record" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// A specialized Result type for docstore operations.
pub type Result<T> = std::result::Result<T, Error>;
