use std::marker::PhantomData;

use tracing::debug;

use crate::api::condition::{Condition, is_null};
use crate::api::expression::{ExpressionBuilder, build};
use crate::api::pager::{self, Pager};
use crate::api::projection;
use crate::api::record::Record;
use crate::error::{Result, StoreError};
use crate::store::{Page, PageRequest, Store};
use crate::types::{Cursor, Item};

/// Issue one `paged_read` per call, resuming from the given cursor.
fn fetcher<S: Store + ?Sized>(
    store: &S,
    mut request: PageRequest,
) -> impl FnMut(Option<Cursor>) -> std::result::Result<Page, StoreError> {
    move |cursor| {
        request.cursor = cursor;
        store.paged_read(&request)
    }
}

fn decode_all<R: Record>(items: Vec<Item>) -> Result<Vec<R>> {
    items
        .into_iter()
        .map(|item| R::from_item(item).map_err(Into::into))
        .collect()
}

// ---------------------------------------------------------------------------
// Read options shared by query and scan
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ReadOptions {
    index: Option<String>,
    filter: Condition,
    projection: Vec<String>,
    limit: Option<usize>,
    page_size: Option<usize>,
}

impl ReadOptions {
    /// Render the key condition and filter into one placeholder map and
    /// assemble the first page request.
    fn request(&self, collection: &str, key_condition: Option<&Condition>) -> Result<PageRequest> {
        let mut expressions = ExpressionBuilder::new();
        let key_text = match key_condition {
            Some(condition) => expressions.render(condition)?,
            None => String::new(),
        };
        let filter_text = expressions.render(&self.filter)?;

        Ok(PageRequest {
            collection: collection.to_string(),
            index: self.index.clone(),
            key_condition: (!key_text.is_empty()).then_some(key_text),
            filter: (!filter_text.is_empty()).then_some(filter_text),
            values: expressions.finish(),
            projection: (!self.projection.is_empty())
                .then(|| projection::expression(&self.projection)),
            page_size: self.page_size,
            cursor: None,
        })
    }
}

// ---------------------------------------------------------------------------
// QueryBuilder
// ---------------------------------------------------------------------------

/// Builder for reading the records that match a key condition.
///
/// The key condition must pin the hash key with `=`; it may further restrict
/// the range key. Pages are fetched one after another until the store runs
/// out or the limit is met.
pub struct QueryBuilder<'a, R, S: ?Sized> {
    store: &'a S,
    collection: &'a str,
    key_condition: Condition,
    options: ReadOptions,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record, S: Store + ?Sized> QueryBuilder<'a, R, S> {
    pub(crate) fn new(store: &'a S, collection: &'a str, key_condition: Condition) -> Self {
        Self {
            store,
            collection,
            key_condition,
            options: ReadOptions::default(),
            _record: PhantomData,
        }
    }

    /// Stop once this many records are collected.
    pub fn limit(mut self, n: usize) -> Self {
        self.options.limit = Some(n);
        self
    }

    /// Ask the store to evaluate at most `n` items per page.
    pub fn page_size(mut self, n: usize) -> Self {
        self.options.page_size = Some(n);
        self
    }

    /// Query a secondary index instead of the primary key.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.options.index = Some(name.into());
        self
    }

    /// Restrict results further after the key condition. Repeated calls are
    /// combined with `and`.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.options.filter = std::mem::take(&mut self.options.filter).and(condition);
        self
    }

    /// Return only these attribute paths (key attributes are always
    /// returned). Fields left out must be `Option` or `#[serde(default)]` in
    /// the record type for decoding to succeed.
    pub fn projection<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.options.projection = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Drain all matching records, up to the limit.
    pub fn execute(self) -> Result<Vec<R>> {
        decode_all(self.execute_items()?)
    }

    /// Drain matching items without decoding them.
    pub(crate) fn execute_items(self) -> Result<Vec<Item>> {
        let request = self
            .options
            .request(self.collection, Some(&self.key_condition))?;
        debug!(
            collection = self.collection,
            operation = "query",
            key_condition = request.key_condition.as_deref().unwrap_or(""),
            limit = ?self.options.limit,
            "executing"
        );
        pager::drain(self.collection, self.options.limit, fetcher(self.store, request))
    }

    /// Lazily iterate over decoded pages. The limit does not apply here; the
    /// caller stops iterating when it has enough.
    pub fn pages(self) -> Result<impl Iterator<Item = Result<Vec<R>>>> {
        let request = self
            .options
            .request(self.collection, Some(&self.key_condition))?;
        let pager = Pager::new(self.collection, fetcher(self.store, request));
        Ok(pager.map(|page| page.and_then(decode_all::<R>)))
    }
}

// ---------------------------------------------------------------------------
// ScanBuilder
// ---------------------------------------------------------------------------

/// Builder for reading every record of a collection that passes a filter.
///
/// A scan reads the whole collection page by page, so its cost grows with
/// the collection rather than with the result.
pub struct ScanBuilder<'a, R, S: ?Sized> {
    store: &'a S,
    collection: &'a str,
    options: ReadOptions,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record, S: Store + ?Sized> ScanBuilder<'a, R, S> {
    pub(crate) fn new(store: &'a S, collection: &'a str, filter: Condition) -> Self {
        Self {
            store,
            collection,
            options: ReadOptions {
                filter,
                ..ReadOptions::default()
            },
            _record: PhantomData,
        }
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.options.limit = Some(n);
        self
    }

    pub fn page_size(mut self, n: usize) -> Self {
        self.options.page_size = Some(n);
        self
    }

    /// Scan a secondary index instead of the base collection.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.options.index = Some(name.into());
        self
    }

    pub fn projection<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.options.projection = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn execute(self) -> Result<Vec<R>> {
        let request = self.options.request(self.collection, None)?;
        debug!(
            collection = self.collection,
            operation = "scan",
            filter = request.filter.as_deref().unwrap_or(""),
            limit = ?self.options.limit,
            "executing"
        );
        let items = pager::drain(self.collection, self.options.limit, fetcher(self.store, request))?;
        decode_all(items)
    }

    pub fn pages(self) -> Result<impl Iterator<Item = Result<Vec<R>>>> {
        let request = self.options.request(self.collection, None)?;
        let pager = Pager::new(self.collection, fetcher(self.store, request));
        Ok(pager.map(|page| page.and_then(decode_all::<R>)))
    }
}

// ---------------------------------------------------------------------------
// PutBuilder
// ---------------------------------------------------------------------------

/// Builder for writing a record, optionally guarded by a precondition.
pub struct PutBuilder<'a, R, S: ?Sized> {
    store: &'a S,
    collection: &'a str,
    record: &'a R,
    condition: Condition,
}

impl<'a, R: Record, S: Store + ?Sized> PutBuilder<'a, R, S> {
    pub(crate) fn new(store: &'a S, collection: &'a str, record: &'a R) -> Self {
        Self {
            store,
            collection,
            record,
            condition: Condition::Everything,
        }
    }

    /// Only write if `condition` holds against the stored item. Repeated
    /// calls are combined with `and`.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = std::mem::take(&mut self.condition).and(condition);
        self
    }

    /// Only write if no item with this key is stored yet.
    pub fn if_absent(self) -> Self {
        self.condition(is_null(R::HASH_KEY))
    }

    /// Write the record. A precondition that does not hold fails with
    /// [`Error::ConditionFailed`](crate::error::Error::ConditionFailed) and
    /// leaves the stored item unchanged.
    pub fn execute(self) -> Result<()> {
        let item = self.record.to_item()?;
        let expression = build(&self.condition)?;
        debug!(
            collection = self.collection,
            operation = "put",
            condition = %expression.text,
            "executing"
        );
        let condition = (!expression.is_empty()).then_some(&expression);
        self.store.point_write(self.collection, item, condition)?;
        Ok(())
    }
}
