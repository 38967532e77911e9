//! Core store data structures.
//!
//! Holds every collection of a store. Wrapped in a single mutex by
//! [`Store`](super::Store); nothing here synchronizes on its own.

use std::any::{type_name, TypeId};
use std::collections::hash_map::Entry as Slot;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::collection::{Collection, ErasedCollection};
use crate::entry::Entry;
use crate::error::RegistrationError;
use crate::schema::FieldMap;

/// Size of one collection, as reported by [`Store::collections`](super::Store::collections).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: &'static str,
    /// Rust type name of the records it holds.
    pub kind: &'static str,
    /// Number of stored records.
    pub len: usize,
}

/// Inner store structure (not thread-safe).
#[derive(Default)]
pub(crate) struct StoreInner {
    /// Collections keyed by record kind.
    collections: HashMap<TypeId, Box<dyn ErasedCollection>>,

    /// Collection name to owning kind. A name belongs to at most one kind.
    owners: HashMap<&'static str, &'static str>,
}

impl StoreInner {
    /// The collection for `T`, created on first use.
    pub(crate) fn ensure<T: Entry>(
        &mut self,
        fields: Arc<FieldMap<T>>,
    ) -> Result<&mut Collection<T>, RegistrationError> {
        let kind = type_name::<T>();

        let slot = match self.collections.entry(TypeId::of::<T>()) {
            Slot::Occupied(occupied) => occupied.into_mut(),
            Slot::Vacant(vacant) => {
                if let Some(&existing) = self.owners.get(T::COLLECTION) {
                    return Err(RegistrationError::CollectionNameTaken {
                        collection: T::COLLECTION,
                        existing,
                        kind,
                    });
                }
                self.owners.insert(T::COLLECTION, kind);
                debug!(collection = T::COLLECTION, kind, "Registered collection");
                vacant.insert(Box::new(Collection::new(fields)))
            }
        };

        let existing = slot.kind();
        slot.as_any_mut()
            .downcast_mut::<Collection<T>>()
            .ok_or(RegistrationError::CollectionNameTaken {
                collection: T::COLLECTION,
                existing,
                kind,
            })
    }

    /// Empty every collection, keeping registrations.
    pub(crate) fn clear(&mut self) {
        for collection in self.collections.values_mut() {
            collection.clear();
        }
    }

    /// Size of every collection, sorted by name.
    pub(crate) fn info(&self) -> Vec<CollectionInfo> {
        let mut info: Vec<CollectionInfo> = self
            .collections
            .values()
            .map(|collection| CollectionInfo {
                name: collection.name(),
                kind: collection.kind(),
                len: collection.len(),
            })
            .collect();
        info.sort_by_key(|c| c.name);
        info
    }
}
