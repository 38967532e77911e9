//! In-memory store backend.
//!
//! All records live in RAM and are **lost when the store is dropped**. The
//! store is meant for tests and short-lived tools that want MongoDB-style
//! queries without a database.
//!
//! # Thread Safety
//!
//! One coarse [`parking_lot::Mutex`] guards every collection for the whole
//! duration of each operation, so operations are strictly serializable and
//! no partial mutation is ever visible. Field maps are cached behind their
//! own lock, which is only ever taken while the store lock is *not* held.
//!
//! # Performance Characteristics
//!
//! - Insert: O(1) amortized
//! - Find / count: O(n) scan of the kind's collection
//! - Delete / update by id: O(n) to locate the record

mod collection;
mod inner;
mod trait_impl;

pub use inner::CollectionInfo;

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::debug;

use crate::config::StoreConfig;
use crate::entry::Entry;
use crate::error::Result;
use crate::filter::{Evaluator, OperatorFn, Operators};
use crate::schema::{FieldMap, FieldMapCache};
use inner::StoreInner;

/// An in-memory document store.
///
/// Stores are explicit instances; create one per test for isolation, or
/// call [`Store::reset`] between tests.
///
/// The query and mutation surface lives on the [`Connection`](crate::Connection) trait.
pub struct Store {
    inner: Mutex<StoreInner>,
    field_maps: FieldMapCache,
    operators: Operators,
    config: StoreConfig,
}

impl Store {
    /// An empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// An empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            field_maps: FieldMapCache::default(),
            operators: Operators::standard(),
            config,
        }
    }

    /// Add a custom operator to this store's operator table.
    ///
    /// # Errors
    ///
    /// Returns a registration error unless the token starts with `$`.
    pub fn with_operator(mut self, token: &str, handler: OperatorFn) -> Result<Self> {
        if self.operators.register(token, handler)?.is_some() {
            debug!(token, "Replaced operator");
        } else {
            debug!(token, "Registered operator");
        }
        Ok(self)
    }

    /// The configuration queries run with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The operator table queries run with.
    #[must_use]
    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    /// Build the field map and collection for `T`.
    ///
    /// Registration is optional: every operation registers its kind on first
    /// use. Registering up front surfaces schema errors at startup. Calls
    /// chain:
    ///
    /// ```
    /// # use docstore::{Entry, Meta, ObjectId, Schema, Schematic, Store};
    /// # #[derive(Clone)] struct A { meta: Meta }
    /// # impl Schematic for A { fn schema() -> Schema<Self> { Schema::new().inline("Meta", |a: &A| &a.meta) } }
    /// # impl Entry for A { const COLLECTION: &'static str = "a"; fn id(&self) -> ObjectId { self.meta.id } }
    /// # #[derive(Clone)] struct B { meta: Meta }
    /// # impl Schematic for B { fn schema() -> Schema<Self> { Schema::new().inline("Meta", |b: &B| &b.meta) } }
    /// # impl Entry for B { const COLLECTION: &'static str = "b"; fn id(&self) -> ObjectId { self.meta.id } }
    /// let store = Store::new();
    /// store.register::<A>()?.register::<B>()?;
    /// # Ok::<(), docstore::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a registration error when `T`'s schema is invalid or its
    /// collection name is taken by another kind.
    pub fn register<T: Entry>(&self) -> Result<&Self> {
        let fields = self.field_map::<T>()?;
        self.lock().ensure(fields)?;
        Ok(self)
    }

    /// The resolved field map of `T`.
    ///
    /// # Errors
    ///
    /// Returns a registration error when `T`'s schema is invalid.
    pub fn field_map<T: Entry>(&self) -> Result<Arc<FieldMap<T>>> {
        Ok(self.field_maps.get_or_build::<T>()?)
    }

    /// Size of every collection, sorted by name.
    #[must_use]
    pub fn collections(&self) -> Vec<CollectionInfo> {
        self.lock().info()
    }

    /// Empty every collection, keeping registrations.
    pub fn reset(&self) {
        self.lock().clear();
        debug!("Reset store");
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock()
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.operators, &self.config)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("collections", &self.collections())
            .field("operators", &self.operators)
            .field("config", &self.config)
            .finish()
    }
}
