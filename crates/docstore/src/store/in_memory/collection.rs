//! Per-kind record storage.

use std::any::Any;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::EvalError;
use crate::filter::{Evaluator, Filter, Scope};
use crate::object_id::ObjectId;
use crate::schema::FieldMap;

/// All records of one kind, in insertion order.
///
/// Records are held behind [`Arc`] so query results can share them without
/// copying. Replacing a record swaps the `Arc`; snapshots already handed out
/// keep the old value.
pub(crate) struct Collection<T> {
    fields: Arc<FieldMap<T>>,
    records: Vec<Arc<T>>,
}

impl<T: Entry> Collection<T> {
    pub(crate) fn new(fields: Arc<FieldMap<T>>) -> Self {
        Self {
            fields,
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: T) {
        self.records.push(Arc::new(record));
    }

    fn position(&self, id: ObjectId) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    /// Remove the first record with `id`.
    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<Arc<T>> {
        self.position(id).map(|index| self.records.remove(index))
    }

    /// Replace the first record sharing `record`'s id, keeping its position.
    ///
    /// Hands the record back when no such record exists.
    pub(crate) fn replace(&mut self, record: T) -> Result<(), T> {
        match self.position(record.id()) {
            Some(index) => {
                self.records[index] = Arc::new(record);
                Ok(())
            }
            None => Err(record),
        }
    }

    /// Records matching every filter, in insertion order, at most `limit` of them.
    pub(crate) fn select(
        &self,
        evaluator: &Evaluator<'_>,
        filters: &[&Filter],
        limit: Option<usize>,
    ) -> Result<Vec<Arc<T>>, EvalError> {
        let mut matched = Vec::new();
        for record in &self.records {
            if limit.is_some_and(|max| matched.len() >= max) {
                break;
            }
            let bound = self.fields.bind(record);
            if evaluator.matches_all(filters, Scope::Record(&bound))? {
                matched.push(Arc::clone(record));
            }
        }
        Ok(matched)
    }
}

/// Kind-independent view of a [`Collection`], so collections of different
/// kinds can share one table.
pub(crate) trait ErasedCollection: Any + Send {
    fn name(&self) -> &'static str;
    fn kind(&self) -> &'static str;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Entry> ErasedCollection for Collection<T> {
    fn name(&self) -> &'static str {
        T::COLLECTION
    }

    fn kind(&self) -> &'static str {
        self.fields.kind()
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn clear(&mut self) {
        self.records.clear();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
