//! An in-process [`Store`] for tests and local development.
//!
//! Collections hold items in a `BTreeMap` ordered by the composite key
//! encoding, so scans return items in hash-then-range order and a cursor is
//! simply the key of the last item a page evaluated. Expressions are parsed
//! and evaluated by [`eval`](super::eval).

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use super::eval;
use super::key::KeySchema;
use super::{Page, PageRequest, Store};
use crate::api::Expression;
use crate::api::projection;
use crate::error::StoreError;
use crate::types::{Cursor, Item, MAX_BATCH_DELETE, MAX_ITEM_SIZE, item_size};

/// Items evaluated per page when the request does not ask for fewer.
pub const DEFAULT_PAGE_SIZE: usize = 100;

struct Collection {
    schema: KeySchema,
    items: BTreeMap<Vec<u8>, Item>,
}

/// A thread-safe in-memory store.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    page_size: usize,
    paged_reads: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            paged_reads: AtomicUsize::new(0),
        }
    }

    /// Cap the number of items evaluated per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn create_collection(
        &self,
        name: impl Into<String>,
        schema: KeySchema,
    ) -> Result<(), StoreError> {
        let name = name.into();
        let mut collections = self.collections.write();
        if collections.contains_key(&name) {
            return Err(StoreError::Validation(format!(
                "collection '{name}' already exists"
            )));
        }
        collections.insert(
            name,
            Collection {
                schema,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of items stored in `collection`.
    pub fn item_count(&self, collection: &str) -> Result<usize, StoreError> {
        let collections = self.collections.read();
        let coll = lookup(&collections, collection)?;
        Ok(coll.items.len())
    }

    /// Number of `paged_read` calls served so far.
    pub fn paged_reads(&self) -> usize {
        self.paged_reads.load(Ordering::Relaxed)
    }
}

fn lookup<'a>(
    collections: &'a HashMap<String, Collection>,
    name: &str,
) -> Result<&'a Collection, StoreError> {
    collections
        .get(name)
        .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
}

fn lookup_mut<'a>(
    collections: &'a mut HashMap<String, Collection>,
    name: &str,
) -> Result<&'a mut Collection, StoreError> {
    collections
        .get_mut(name)
        .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
}

impl Store for MemoryStore {
    fn point_read(&self, collection: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        let collections = self.collections.read();
        let coll = lookup(&collections, collection)?;
        let encoded = coll.schema.encode(key)?;
        Ok(coll.items.get(&encoded).cloned())
    }

    fn point_write(
        &self,
        collection: &str,
        item: Item,
        condition: Option<&Expression>,
    ) -> Result<(), StoreError> {
        let size = item_size(&item);
        if size > MAX_ITEM_SIZE {
            return Err(StoreError::Validation(format!(
                "item size {size} exceeds maximum of {MAX_ITEM_SIZE} bytes"
            )));
        }

        let mut collections = self.collections.write();
        let coll = lookup_mut(&mut collections, collection)?;
        let encoded = coll.schema.encode(&item)?;

        if let Some(condition) = condition.filter(|c| !c.is_empty()) {
            let expr = eval::parse(&condition.text)?;
            let empty = Item::new();
            let current = coll.items.get(&encoded).unwrap_or(&empty);
            if !expr.eval(current, &condition.values)? {
                trace!(collection, condition = %condition.text, "precondition failed");
                return Err(StoreError::ConditionFailed);
            }
        }

        coll.items.insert(encoded, item);
        Ok(())
    }

    fn point_delete(&self, collection: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        let mut collections = self.collections.write();
        let coll = lookup_mut(&mut collections, collection)?;
        let encoded = coll.schema.encode(key)?;
        Ok(coll.items.remove(&encoded))
    }

    fn paged_read(&self, request: &PageRequest) -> Result<Page, StoreError> {
        self.paged_reads.fetch_add(1, Ordering::Relaxed);

        if let Some(index) = &request.index {
            return Err(StoreError::Validation(format!(
                "index '{index}' not found: MemoryStore has no secondary indexes"
            )));
        }

        let collections = self.collections.read();
        let coll = lookup(&collections, &request.collection)?;

        let key_condition = match &request.key_condition {
            Some(text) => {
                let expr = eval::parse(text)?;
                expr.check_key_condition(&coll.schema.hash, coll.schema.range.as_deref())?;
                Some(expr)
            }
            None => None,
        };
        let filter = request.filter.as_deref().map(eval::parse).transpose()?;
        let paths = request
            .projection
            .as_deref()
            .map(projection::parse)
            .unwrap_or_default();
        let key_attrs = coll.schema.attributes();

        let start = match &request.cursor {
            Some(cursor) => Bound::Excluded(coll.schema.encode(cursor.last_evaluated_key())?),
            None => Bound::Unbounded,
        };
        let page_size = request.page_size.unwrap_or(self.page_size).max(1);

        let mut range = coll.items.range((start, Bound::Unbounded)).peekable();
        let mut items = Vec::new();
        let mut evaluated = 0;
        let mut last = None;

        while evaluated < page_size {
            let Some((_, item)) = range.next() else {
                break;
            };
            evaluated += 1;
            last = Some(item);

            if let Some(expr) = &key_condition
                && !expr.eval(item, &request.values)?
            {
                continue;
            }
            if let Some(expr) = &filter
                && !expr.eval(item, &request.values)?
            {
                continue;
            }
            items.push(projection::apply_projection(item, &paths, &key_attrs));
        }

        let cursor = match last {
            Some(item) if range.peek().is_some() => Some(Cursor::new(coll.schema.key_of(item)?)),
            _ => None,
        };

        trace!(
            collection = %request.collection,
            evaluated,
            returned = items.len(),
            has_more = cursor.is_some(),
            "paged read"
        );
        Ok(Page { items, cursor })
    }

    fn batch_delete(&self, collection: &str, keys: Vec<Item>) -> Result<(), StoreError> {
        if keys.len() > MAX_BATCH_DELETE {
            return Err(StoreError::Validation(format!(
                "batch of {} keys exceeds maximum of {MAX_BATCH_DELETE}",
                keys.len()
            )));
        }

        let mut collections = self.collections.write();
        let coll = lookup_mut(&mut collections, collection)?;
        let encoded = keys
            .iter()
            .map(|key| coll.schema.encode(key))
            .collect::<Result<Vec<_>, _>>()?;
        for key in encoded {
            coll.items.remove(&key);
        }
        trace!(collection, deleted = keys.len(), "batch delete");
        Ok(())
    }
}
