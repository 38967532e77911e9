//! Connection trait implementation for the in-memory store.

use std::sync::Arc;
use tracing::{debug, trace};

use super::Store;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::store::Connection;

impl Store {
    fn select<T: Entry>(&self, filter: &Filter, limit: Option<usize>) -> Result<Vec<Arc<T>>> {
        let fields = self.field_map::<T>()?;
        let default_filter = T::default_filter();
        self.operators.validate(&default_filter)?;
        self.operators.validate(filter)?;
        let evaluator = self.evaluator();

        let mut inner = self.lock();
        let collection = inner.ensure(fields)?;
        let matched = collection.select(&evaluator, &[&default_filter, filter], limit)?;

        trace!(
            collection = T::COLLECTION,
            matched = matched.len(),
            "Ran query"
        );
        Ok(matched)
    }
}

impl Connection for Store {
    fn insert<T: Entry>(&self, record: T) -> Result<()> {
        let fields = self.field_map::<T>()?;
        let id = record.id();

        self.lock().ensure(fields)?.push(record);

        debug!(collection = T::COLLECTION, %id, "Inserted record");
        Ok(())
    }

    fn insert_many<T, I>(&self, records: I) -> Result<usize>
    where
        T: Entry,
        I: IntoIterator<Item = T>,
    {
        let fields = self.field_map::<T>()?;

        let mut inner = self.lock();
        let collection = inner.ensure(fields)?;
        let mut inserted = 0;
        for record in records {
            collection.push(record);
            inserted += 1;
        }

        debug!(collection = T::COLLECTION, inserted, "Inserted records");
        Ok(inserted)
    }

    fn find_shared<T: Entry>(&self, filter: &Filter) -> Result<Vec<Arc<T>>> {
        self.select(filter, None)
    }

    fn find_one<T: Entry>(&self, filter: &Filter) -> Result<T> {
        self.select::<T>(filter, Some(1))?
            .first()
            .map(|record| T::clone(record))
            .ok_or(Error::NotFound {
                collection: T::COLLECTION,
            })
    }

    fn delete_by_id<T: Entry>(&self, record: &T) -> Result<()> {
        let fields = self.field_map::<T>()?;
        let id = record.id();

        self.lock()
            .ensure(fields)?
            .remove(id)
            .ok_or(Error::NotFound {
                collection: T::COLLECTION,
            })?;

        debug!(collection = T::COLLECTION, %id, "Deleted record");
        Ok(())
    }

    fn update_by_id<T: Entry>(&self, record: T) -> Result<()> {
        let fields = self.field_map::<T>()?;
        let id = record.id();

        self.lock()
            .ensure(fields)?
            .replace(record)
            .map_err(|_| Error::NotFound {
                collection: T::COLLECTION,
            })?;

        debug!(collection = T::COLLECTION, %id, "Updated record");
        Ok(())
    }
}
