//! Storage abstraction for docstore.
//!
//! [`Connection`] is the query and mutation surface application code is
//! written against; [`Store`] is its in-memory implementation.
//!
//! # Example
//!
//! ```
//! use docstore::{Connection, Entry, Filter, Meta, ObjectId, Schema, Schematic, Store};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct ZipRange {
//!     meta: Meta,
//!     from: u32,
//!     to: u32,
//! }
//!
//! impl Schematic for ZipRange {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .inline("Meta", |z: &ZipRange| &z.meta)
//!             .field("From", |z: &ZipRange| z.from.into())
//!             .field("To", |z: &ZipRange| z.to.into())
//!     }
//! }
//!
//! impl Entry for ZipRange {
//!     const COLLECTION: &'static str = "zip_ranges";
//!
//!     fn id(&self) -> ObjectId {
//!         self.meta.id
//!     }
//! }
//!
//! let store = Store::new();
//! store.insert(ZipRange { meta: Meta::new(), from: 1000, to: 2000 })?;
//!
//! let lookup: Filter = r#"{"from": {"$lte": 1500}, "to": {"$gte": 1500}}"#.parse()?;
//! let range: ZipRange = store.find_one(&lookup)?;
//! assert_eq!(range.from, 1000);
//! # Ok::<(), docstore::Error>(())
//! ```

use std::sync::Arc;

use crate::entry::Entry;
use crate::error::Result;
use crate::filter::Filter;

pub mod in_memory;

pub use in_memory::{CollectionInfo, Store};

/// Query and mutation surface of a document store.
///
/// Every query ANDs the kind's [`Entry::default_filter`] with the caller's
/// filter, and returns records in insertion order. Operations on a kind
/// that was never registered register it first.
///
/// # Error Handling
///
/// - [`Error::NotFound`](crate::Error::NotFound): `find_one`, `delete_by_id`
///   and `update_by_id` found no record
/// - [`Error::Evaluation`](crate::Error::Evaluation): the filter is malformed
///   for this query
/// - [`Error::Registration`](crate::Error::Registration): the kind could not
///   be registered
pub trait Connection: Send + Sync {
    /// Append a record to its kind's collection.
    fn insert<T: Entry>(&self, record: T) -> Result<()>;

    /// Append records in order, returning how many were inserted.
    fn insert_many<T, I>(&self, records: I) -> Result<usize>
    where
        T: Entry,
        I: IntoIterator<Item = T>;

    /// All matching records as shared, immutable snapshots.
    fn find_shared<T: Entry>(&self, filter: &Filter) -> Result<Vec<Arc<T>>>;

    /// The first matching record.
    fn find_one<T: Entry>(&self, filter: &Filter) -> Result<T>;

    /// Remove the record sharing `record`'s id.
    fn delete_by_id<T: Entry>(&self, record: &T) -> Result<()>;

    /// Replace the record sharing `record`'s id, keeping its position.
    fn update_by_id<T: Entry>(&self, record: T) -> Result<()>;

    /// All matching records as independent copies.
    fn find<T: Entry>(&self, filter: &Filter) -> Result<Vec<T>> {
        Ok(self
            .find_shared::<T>(filter)?
            .iter()
            .map(|record| T::clone(record))
            .collect())
    }

    /// Number of matching records.
    fn count<T: Entry>(&self, filter: &Filter) -> Result<usize> {
        Ok(self.find_shared::<T>(filter)?.len())
    }
}
