//! The external store: the operations dynamap needs from a store client.
//!
//! dynamap does no storage of its own. Anything that implements [`Store`]
//! (a wrapper around a network client, a test double, the bundled
//! [`MemoryStore`]) can back a [`Table`](crate::api::Table). Atomicity,
//! durability, indexing, timeouts and cancellation are the store's business;
//! errors it reports are passed through unchanged.

pub mod eval;
pub mod key;
pub mod memory;

pub use key::KeySchema;
pub use memory::MemoryStore;

use crate::api::Expression;
use crate::error::StoreError;
use crate::types::{Cursor, Item};

/// One request for a page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub collection: String,
    /// Secondary index to read instead of the primary one.
    pub index: Option<String>,
    /// Key condition. `None` reads the whole collection (a scan).
    pub key_condition: Option<String>,
    /// Filter applied by the store after the key condition.
    pub filter: Option<String>,
    /// Placeholder values shared by `key_condition` and `filter`.
    pub values: Item,
    /// Comma-separated attribute paths to return.
    pub projection: Option<String>,
    /// Maximum items the store should evaluate for this page.
    pub page_size: Option<usize>,
    /// Where the previous page stopped.
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Whether this request reads without a key condition.
    pub fn is_scan(&self) -> bool {
        self.key_condition.is_none()
    }
}

/// One page of results. `cursor` is present iff more data may follow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    pub cursor: Option<Cursor>,
}

/// Client for a key-value store with a hash key, optional range key and
/// typed attributes.
pub trait Store {
    /// Read one item by its key attributes.
    fn point_read(&self, collection: &str, key: &Item) -> Result<Option<Item>, StoreError>;

    /// Write an item, replacing any item with the same key. When `condition`
    /// is given the write only happens if it holds against the stored item
    /// (an absent item has no attributes); otherwise the store returns
    /// [`StoreError::ConditionFailed`] and leaves the item unchanged.
    fn point_write(
        &self,
        collection: &str,
        item: Item,
        condition: Option<&Expression>,
    ) -> Result<(), StoreError>;

    /// Delete one item, returning what was stored.
    fn point_delete(&self, collection: &str, key: &Item) -> Result<Option<Item>, StoreError>;

    /// Read one page of a query or scan.
    fn paged_read(&self, request: &PageRequest) -> Result<Page, StoreError>;

    /// Delete up to [`MAX_BATCH_DELETE`](crate::types::MAX_BATCH_DELETE) items by key.
    fn batch_delete(&self, collection: &str, keys: Vec<Item>) -> Result<(), StoreError>;
}
