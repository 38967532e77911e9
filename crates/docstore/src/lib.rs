//! Docstore - an in-memory document store queried with MongoDB-style filters.
//!
//! Record kinds describe their fields once through [`Schematic`]; the store
//! resolves that description into a [`FieldMap`] and evaluates [`Filter`]
//! expressions against records through it. The query surface is the
//! [`Connection`] trait, implemented by [`Store`].

#![forbid(unsafe_code)]

pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod object_id;
pub mod schema;
pub mod store;
pub mod value;

pub use config::{StoreConfig, UnknownFieldPolicy};
pub use entry::{Entry, Meta};
pub use error::{ConfigError, Error, EvalError, FilterError, RegistrationError, Result};
pub use filter::{Evaluator, Filter, Operand, Operator, OperatorFn, Operators, Scope};
pub use object_id::ObjectId;
pub use schema::{FieldMap, Schema, Schematic};
pub use store::{CollectionInfo, Connection, Store};
pub use value::{Category, Document, Value};
