//! Cursor-following page iteration.
//!
//! A [`Pager`] issues one page request per step, strictly in sequence, each
//! resuming from the cursor the previous page returned. It stops once the
//! store returns no cursor or a request fails. [`drain`] collects pages until
//! exhaustion or until a result limit is met.

use std::mem;

use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::store::Page;
use crate::types::{Cursor, Item};

enum State {
    /// Next request resumes from this cursor (`None` for the first page).
    Fetching(Option<Cursor>),
    Done,
}

/// Lazy iterator over the pages of one query or scan.
///
/// `fetch` is called with the cursor to resume from and returns one page.
pub struct Pager<F> {
    collection: String,
    fetch: F,
    state: State,
    pages: usize,
}

impl<F> Pager<F>
where
    F: FnMut(Option<Cursor>) -> std::result::Result<Page, StoreError>,
{
    pub fn new(collection: impl Into<String>, fetch: F) -> Self {
        Self {
            collection: collection.into(),
            fetch,
            state: State::Fetching(None),
            pages: 0,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// The cursor the next request would resume from, if any.
    pub fn cursor(&self) -> Option<&Cursor> {
        match &self.state {
            State::Fetching(cursor) => cursor.as_ref(),
            State::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

impl<F> Iterator for Pager<F>
where
    F: FnMut(Option<Cursor>) -> std::result::Result<Page, StoreError>,
{
    type Item = Result<Vec<Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        let State::Fetching(cursor) = mem::replace(&mut self.state, State::Done) else {
            return None;
        };

        match (self.fetch)(cursor) {
            Ok(Page { items, cursor }) => {
                self.pages += 1;
                debug!(
                    collection = %self.collection,
                    page = self.pages,
                    items = items.len(),
                    has_more = cursor.is_some(),
                    "fetched page"
                );
                if cursor.is_some() {
                    self.state = State::Fetching(cursor);
                }
                Some(Ok(items))
            }
            // State stays Done: a failed pager yields nothing further.
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Fetch pages until the store runs out or `limit` items are collected.
///
/// The last page may overshoot the limit; the result is truncated to exactly
/// `limit` items. Any failed request aborts the drain and discards what was
/// collected so far.
pub fn drain<F>(collection: &str, limit: Option<usize>, fetch: F) -> Result<Vec<Item>>
where
    F: FnMut(Option<Cursor>) -> std::result::Result<Page, StoreError>,
{
    if limit == Some(0) {
        return Ok(Vec::new());
    }

    let mut pager = Pager::new(collection, fetch);
    let mut accumulated = Vec::new();

    while let Some(page) = pager.next() {
        match page {
            Ok(items) => accumulated.extend(items),
            Err(e) => {
                warn!(
                    collection,
                    pages = pager.pages_fetched(),
                    discarded = accumulated.len(),
                    error = %e,
                    "drain aborted"
                );
                return Err(e);
            }
        }

        if let Some(limit) = limit
            && accumulated.len() >= limit
        {
            debug!(collection, limit, fetched = accumulated.len(), "limit reached");
            accumulated.truncate(limit);
            break;
        }
    }

    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::Error;
    use crate::types::AttrValue;

    fn item(n: usize) -> Item {
        let mut item = Item::new();
        item.insert("Id".to_string(), AttrValue::from(n));
        item
    }

    fn cursor(n: usize) -> Cursor {
        Cursor::new(item(n))
    }

    /// A store that serves `pages` pages of `per_page` items, counting calls.
    /// Cursors are the index of the next page.
    fn scripted(
        pages: usize,
        per_page: usize,
        calls: &Cell<usize>,
    ) -> impl FnMut(Option<Cursor>) -> std::result::Result<Page, StoreError> + '_ {
        move |resume| {
            calls.set(calls.get() + 1);
            let page = match resume {
                None => 0,
                Some(c) => match c.last_evaluated_key()["Id"].as_n() {
                    Some(n) => n.parse::<usize>().unwrap_or(0),
                    None => 0,
                },
            };
            let items = (0..per_page).map(|i| item(page * per_page + i)).collect();
            let next = (page + 1 < pages).then(|| cursor(page + 1));
            Ok(Page {
                items,
                cursor: next,
            })
        }
    }

    fn ids(items: &[Item]) -> Vec<String> {
        items
            .iter()
            .map(|i| i["Id"].as_n().unwrap_or_default().to_string())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Drain
    // -----------------------------------------------------------------------

    #[test]
    fn test_drain_exhausts_all_pages_in_order() {
        let calls = Cell::new(0);
        let items = drain("t", None, scripted(3, 2, &calls)).unwrap();
        assert_eq!(ids(&items), vec!["0", "1", "2", "3", "4", "5"]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_drain_limit_truncates_and_stops() {
        let calls = Cell::new(0);
        let items = drain("t", Some(5), scripted(3, 2, &calls)).unwrap();
        assert_eq!(ids(&items), vec!["0", "1", "2", "3", "4"]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_drain_limit_on_page_boundary_stops_early() {
        let calls = Cell::new(0);
        let items = drain("t", Some(4), scripted(3, 2, &calls)).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_drain_limit_larger_than_data() {
        let calls = Cell::new(0);
        let items = drain("t", Some(100), scripted(3, 2, &calls)).unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_drain_zero_limit_issues_no_request() {
        let calls = Cell::new(0);
        let items = drain("t", Some(0), scripted(3, 2, &calls)).unwrap();
        assert!(items.is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_drain_empty_store() {
        let calls = Cell::new(0);
        let items = drain("t", None, scripted(1, 0, &calls)).unwrap();
        assert!(items.is_empty());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_drain_empty_page_with_cursor_keeps_going() {
        let mut served = 0;
        let items = drain("t", None, |_| {
            served += 1;
            Ok(match served {
                1 => Page {
                    items: vec![],
                    cursor: Some(cursor(1)),
                },
                _ => Page {
                    items: vec![item(9)],
                    cursor: None,
                },
            })
        })
        .unwrap();
        assert_eq!(ids(&items), vec!["9"]);
    }

    #[test]
    fn test_drain_aborts_on_error_discarding_partial_results() {
        let mut served = 0;
        let result = drain("t", None, |_| {
            served += 1;
            match served {
                1 => Ok(Page {
                    items: vec![item(1), item(2)],
                    cursor: Some(cursor(1)),
                }),
                _ => Err(StoreError::Timeout),
            }
        });
        assert!(matches!(result, Err(Error::Transport(StoreError::Timeout))));
        assert_eq!(served, 2);
    }

    // -----------------------------------------------------------------------
    // Pager
    // -----------------------------------------------------------------------

    #[test]
    fn test_pager_is_lazy() {
        let calls = Cell::new(0);
        let mut pager = Pager::new("t", scripted(3, 2, &calls));
        assert_eq!(calls.get(), 0);

        let first = pager.next().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(calls.get(), 1);
        assert!(pager.cursor().is_some());
        assert!(!pager.is_done());

        assert_eq!(pager.by_ref().count(), 2);
        assert!(pager.is_done());
        assert!(pager.next().is_none());
        assert_eq!(pager.pages_fetched(), 3);
    }

    #[test]
    fn test_pager_stops_after_error() {
        let mut pager = Pager::new("t", |_| Err(StoreError::Throttled));
        assert!(matches!(
            pager.next(),
            Some(Err(Error::Transport(StoreError::Throttled)))
        ));
        assert!(pager.next().is_none());
    }
}
