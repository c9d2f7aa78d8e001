//! Typed access to one collection.

use std::marker::PhantomData;

use tracing::{debug, info};

use crate::api::builders::{PutBuilder, QueryBuilder, ScanBuilder};
use crate::api::condition::Condition;
use crate::api::record::Record;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Item, Key, MAX_BATCH_DELETE};

/// A collection of `R` records in a store.
///
/// The store handle is owned by the caller and borrowed here; any number of
/// tables (for different collections or record types) can share it. A table
/// holds no mutable state, so it is as safe to share across threads as the
/// store it borrows.
pub struct Table<'s, R, S: ?Sized> {
    store: &'s S,
    name: String,
    _record: PhantomData<fn() -> R>,
}

impl<'s, R: Record, S: Store + ?Sized> Table<'s, R, S> {
    pub fn new(store: &'s S, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            _record: PhantomData,
        }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    fn key_item(key: &Key) -> Result<Item> {
        Ok(key.to_item(R::HASH_KEY, R::RANGE_KEY)?)
    }

    /// Read one record by key, failing with [`Error::NotFound`] if absent.
    pub fn get(&self, key: impl Into<Key>) -> Result<R> {
        self.try_get(key)?.ok_or_else(|| Error::NotFound {
            collection: self.name.clone(),
        })
    }

    /// Read one record by key.
    pub fn try_get(&self, key: impl Into<Key>) -> Result<Option<R>> {
        let key = Self::key_item(&key.into())?;
        debug!(collection = %self.name, operation = "get", "executing");
        match self.store.point_read(&self.name, &key)? {
            Some(item) => Ok(Some(R::from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Start a query. `key_condition` must test the hash key with `=` and
    /// may restrict the range key.
    pub fn query(&self, key_condition: Condition) -> QueryBuilder<'_, R, S> {
        QueryBuilder::new(self.store, &self.name, key_condition)
    }

    /// Start a scan of the whole collection, keeping records that pass
    /// `filter`. Use [`everything`](crate::api::condition::everything) to
    /// keep all of them.
    pub fn scan(&self, filter: Condition) -> ScanBuilder<'_, R, S> {
        ScanBuilder::new(self.store, &self.name, filter)
    }

    /// Start a write of `record`.
    pub fn put<'a>(&'a self, record: &'a R) -> PutBuilder<'a, R, S> {
        PutBuilder::new(self.store, &self.name, record)
    }

    /// Delete one record by key, returning what was stored (`None` if
    /// nothing was).
    pub fn delete(&self, key: impl Into<Key>) -> Result<Option<R>> {
        let key = Self::key_item(&key.into())?;
        debug!(collection = %self.name, operation = "delete", "executing");
        match self.store.point_delete(&self.name, &key)? {
            Some(item) => Ok(Some(R::from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Delete the stored record with the same key as `record`.
    pub fn delete_record(&self, record: &R) -> Result<Option<R>> {
        self.delete(record.key()?)
    }

    /// Delete every record matching `key_condition`, returning how many keys
    /// were deleted.
    ///
    /// This is a query followed by batched deletes, not a transaction:
    /// records written after the query step are not deleted, and records
    /// changed between the two steps are deleted by key regardless of their
    /// new contents. A failure part-way through leaves earlier batches
    /// deleted.
    pub fn delete_by_query(&self, key_condition: Condition) -> Result<usize> {
        let key_attributes = R::key_attributes();
        let items = self
            .query(key_condition)
            .projection(key_attributes.iter().copied())
            .execute_items()?;

        let keys = items
            .iter()
            .map(|item| {
                let key = Key::from_item(item, R::HASH_KEY, R::RANGE_KEY)?;
                Self::key_item(&key)
            })
            .collect::<Result<Vec<_>>>()?;

        for batch in keys.chunks(MAX_BATCH_DELETE) {
            self.store.batch_delete(&self.name, batch.to_vec())?;
        }

        info!(
            collection = %self.name,
            deleted = keys.len(),
            batches = keys.len().div_ceil(MAX_BATCH_DELETE),
            "delete by query"
        );
        Ok(keys.len())
    }
}
