//! Page-addressed access over a cursor-capable query.

use std::cell::Cell;
use std::sync::Arc;

use pagewise_proto::{Cursor, Filter, Key, OrderSpec, Value};
use tracing::{debug, instrument, trace};

use super::cache::{CursorCache, PagingStats, PagingStatsSnapshot};
use super::links::{PageLink, PageLinks};
use super::page_size::PageSize;
use super::store::{CursorKey, CursorStore};
use crate::config::PagingConfig;
use crate::error::{Error, Result};
use crate::query::{BaseQuery, FetchOptions, FetchRequest, QueryIdentity};

/// Arguments of [`PagedQuery::fetch_page_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: usize,
    /// Drop all cached state before fetching.
    pub clear: bool,
}

impl PageRequest {
    /// Request a page.
    pub fn new(page: usize) -> Self {
        Self { page, clear: false }
    }

    /// Clear the cache before fetching.
    pub fn clear(mut self) -> Self {
        self.clear = true;
        self
    }
}

/// Wraps a [`BaseQuery`] and addresses its result set by page number.
///
/// Cursors discovered while fetching are cached so later requests for the
/// same or following pages resume from them. When a cursor store is
/// attached, cursors are also shared with other instances of the same
/// query.
///
/// Cached state is bound to the query's configuration and page size:
/// changing either drops it. Changes to the underlying data are not
/// detected; call [`clear`](Self::clear) after writes.
pub struct PagedQuery<Q: BaseQuery> {
    query: Q,
    page_size: PageSize,
    config: PagingConfig,
    cache: CursorCache,
    stats: PagingStats,
    identity: Cell<Option<QueryIdentity>>,
    store: Option<Arc<dyn CursorStore>>,
    last_persisted_as: Option<CursorKey>,
}

impl<Q: BaseQuery> PagedQuery<Q> {
    /// Wrap `query` with the given page size.
    pub fn new<S>(query: Q, page_size: S) -> Result<Self>
    where
        S: TryInto<PageSize, Error = Error>,
    {
        Ok(Self {
            query,
            page_size: page_size.try_into()?,
            config: PagingConfig::default(),
            cache: CursorCache::new(),
            stats: PagingStats::new(),
            identity: Cell::new(None),
            store: None,
            last_persisted_as: None,
        })
    }

    /// Use a non-default configuration.
    pub fn with_config(mut self, config: PagingConfig) -> Self {
        self.config = config;
        self
    }

    /// Share cursors through `store`.
    pub fn with_cursor_store(mut self, store: Arc<dyn CursorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The wrapped query.
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Unwrap the query.
    pub fn into_inner(self) -> Q {
        self.query
    }

    /// Current page size.
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Change the page size. Cached cursors and counts are for the old size
    /// and are dropped when it changes.
    pub fn set_page_size<S>(&mut self, page_size: S) -> Result<()>
    where
        S: TryInto<PageSize, Error = Error>,
    {
        let page_size = page_size.try_into()?;
        if page_size != self.page_size {
            self.page_size = page_size;
            self.clear();
        }
        Ok(())
    }

    /// Add a filter from a `"<field> <op>"` expression.
    pub fn filter(&mut self, expr: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.ensure_mutable("filter")?;
        self.query.filter(Filter::parse(expr, value)?)?;
        self.invalidate();
        Ok(self)
    }

    /// Add an order clause, `"field"` or `"-field"`.
    pub fn order(&mut self, expr: &str) -> Result<&mut Self> {
        self.ensure_mutable("order")?;
        self.query.order(OrderSpec::parse(expr)?)?;
        self.invalidate();
        Ok(self)
    }

    /// Restrict results to descendants of `key`.
    pub fn ancestor(&mut self, key: Key) -> Result<&mut Self> {
        self.ensure_mutable("ancestor")?;
        self.query.ancestor(key)?;
        self.invalidate();
        Ok(self)
    }

    /// Raw fetch on the wrapped query, bypassing page bookkeeping.
    pub fn fetch(&mut self, options: FetchOptions) -> Result<Vec<Q::Record>> {
        self.query.fetch(&options.into_request()?)
    }

    /// Raw count on the wrapped query.
    pub fn count(&self, limit: Option<usize>) -> Result<usize> {
        self.query.count(limit)
    }

    /// Identity of the wrapped query's configuration, computed on first use.
    pub fn id(&self) -> Result<QueryIdentity> {
        if let Some(id) = self.identity.get() {
            return Ok(id);
        }
        let id = QueryIdentity::of(&self.query.shape())?;
        self.identity.set(Some(id));
        Ok(id)
    }

    /// Drop cached cursors and counts.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.last_persisted_as = None;
    }

    /// Cached cursors, index 0 being the start sentinel.
    pub fn cursors(&self) -> &[Option<Cursor>] {
        self.cache.cursors()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> PagingStatsSnapshot {
        self.stats.snapshot()
    }

    /// Key under which the most recent cursor was persisted.
    pub fn last_persisted_as(&self) -> Option<&CursorKey> {
        self.last_persisted_as.as_ref()
    }

    /// Fetch one page.
    pub fn fetch_page(&mut self, page: usize) -> Result<Vec<Q::Record>> {
        self.fetch_page_with(PageRequest::new(page))
    }

    /// Fetch one page with options.
    ///
    /// Pages past the end come back empty. Pages are served, in order of
    /// preference, from a cached or stored cursor for the preceding page,
    /// by walking forward from a nearby known cursor, or by a single offset
    /// query from the nearest known position.
    #[instrument(skip(self), fields(page = request.page, page_size = self.page_size.get()))]
    pub fn fetch_page_with(&mut self, request: PageRequest) -> Result<Vec<Q::Record>> {
        let page = request.page;
        if page == 0 {
            return Err(Error::InvalidArgument("page numbers start at 1".into()));
        }
        if request.clear {
            self.clear();
        }

        if let Some(start) = self.known_start(page)? {
            return self.fetch_from(page, start);
        }

        if self.cache.page_exists(page, self.page_size.get()) == Some(false) {
            debug!("page is past the end of the results");
            return Ok(Vec::new());
        }

        let (from_page, cursor) = self.cache.nearest_start(page);
        if cursor.is_some() && page - from_page <= self.config.max_cursor_walk {
            return self.walk_forward(from_page, cursor, page);
        }
        self.offset_fetch(from_page, cursor, page)
    }

    /// Number of pages, from the cache when known and one backend count
    /// otherwise. The count is memoised until the cache is cleared.
    pub fn page_count(&mut self) -> Result<usize> {
        let total = match self.cache.total_count() {
            Some(total) => total,
            None => {
                let total = self.query.count(None)?;
                self.stats.record_count_call();
                self.cache.set_total_count(total);
                debug!(total, "counted results");
                total
            }
        };
        Ok(total.div_ceil(self.page_size.get()))
    }

    /// Whether `page` holds at least one record. Answers from the cache when
    /// it can and falls back to [`page_count`](Self::page_count).
    pub fn has_page(&mut self, page: usize) -> Result<bool> {
        match self.cache.page_exists(page, self.page_size.get()) {
            Some(known) => Ok(known),
            None => Ok(page <= self.page_count()?),
        }
    }

    /// Page links around `current`, using the configured link window.
    pub fn links(&mut self, current: usize, base_url: &str, param: &str) -> Result<Vec<PageLink>> {
        let total = self.page_count()?;
        Ok(PageLinks::new(current, total, base_url, param, self.config.link_window)?.links())
    }

    fn ensure_mutable(&self, operation: &str) -> Result<()> {
        if !self.query.supports_mutation() {
            return Err(Error::UnsupportedOperation(format!(
                "{operation} is not available on a fixed query"
            )));
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.clear();
        self.identity.set(None);
    }

    /// Start position of `page` if it is known, consulting the cursor store
    /// when the cache misses. `Some(None)` is the start of results.
    fn known_start(&mut self, page: usize) -> Result<Option<Option<Cursor>>> {
        if page == 1 {
            return Ok(Some(None));
        }
        if let Some(cursor) = self.cache.cursor_at(page - 1) {
            return Ok(Some(Some(cursor.clone())));
        }
        let Some(store) = self.store.clone() else {
            return Ok(None);
        };
        let key = CursorKey::new(self.id()?, self.page_size.get(), page - 1);
        match store.get(&key)? {
            Some(cursor) => {
                trace!(%key, "restored cursor");
                self.stats.record_restore();
                self.cache.record(page - 1, cursor.clone());
                Ok(Some(Some(cursor)))
            }
            None => Ok(None),
        }
    }

    fn fetch_from(&mut self, page: usize, start: Option<Cursor>) -> Result<Vec<Q::Record>> {
        let request = FetchRequest::new(self.page_size.get()).starting_at(start);
        let records = self.query.fetch(&request)?;
        self.after_fetch(page, records.len())?;
        Ok(records)
    }

    fn walk_forward(
        &mut self,
        from_page: usize,
        cursor: Option<Cursor>,
        page: usize,
    ) -> Result<Vec<Q::Record>> {
        debug!(from_page, "walking forward from cached cursor");
        self.stats.record_cursor_walk();
        let mut start = cursor;
        for current in from_page..page {
            let records = self.fetch_from(current, start)?;
            if records.len() < self.page_size.get() {
                return Ok(Vec::new());
            }
            start = match self.cache.cursor_at(current) {
                Some(cursor) => Some(cursor.clone()),
                // The backend gave no cursor to continue from.
                None => return self.offset_fetch(1, None, page),
            };
        }
        self.fetch_from(page, start)
    }

    fn offset_fetch(
        &mut self,
        from_page: usize,
        cursor: Option<Cursor>,
        page: usize,
    ) -> Result<Vec<Q::Record>> {
        let size = self.page_size.get();
        let Some(offset) = (page - from_page).checked_mul(size) else {
            // No result set can be that long.
            debug!("page offset overflows, page is past the end of the results");
            return Ok(Vec::new());
        };
        debug!(from_page, offset, "offset query");
        self.stats.record_offset_query();
        let request = FetchRequest::new(size)
            .with_offset(offset)
            .starting_at(cursor);
        let records = self.query.fetch(&request)?;
        self.after_fetch(page, records.len())?;
        Ok(records)
    }

    fn after_fetch(&mut self, page: usize, returned: usize) -> Result<()> {
        let size = self.page_size.get();
        self.cache.observe(page, returned, size);
        if returned < size {
            return Ok(());
        }
        let Some(cursor) = self.query.cursor() else {
            return Ok(());
        };
        if self.cache.record(page, cursor.clone()) {
            self.persist(page, &cursor)?;
        }
        Ok(())
    }

    fn persist(&mut self, index: usize, cursor: &Cursor) -> Result<()> {
        if !self.config.persist_cursors {
            return Ok(());
        }
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let key = CursorKey::new(self.id()?, self.page_size.get(), index);
        store.put(&key, cursor)?;
        self.stats.record_persist();
        trace!(%key, "persisted cursor");
        self.last_persisted_as = Some(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Entity, MemoryStore};

    fn store(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store.put(&Entity::new(Key::new("Item", format!("{i:03}"))).with("n", i as i64));
        }
        store
    }

    #[test]
    fn test_page_zero_rejected() {
        let mut paged = PagedQuery::new(store(3).query("Item"), 2).unwrap();
        assert!(matches!(paged.fetch_page(0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_page_size() {
        assert!(PagedQuery::new(store(3).query("Item"), 0).is_err());
        assert!(PagedQuery::new(store(3).query("Item"), -1).is_err());
        assert!(PagedQuery::new(store(3).query("Item"), 1.5).is_err());
    }

    #[test]
    fn test_sequential_pages_use_cursors() {
        let mut paged = PagedQuery::new(store(5).query("Item"), 2).unwrap();
        paged.order("n").unwrap();

        assert_eq!(paged.fetch_page(1).unwrap().len(), 2);
        assert_eq!(paged.fetch_page(2).unwrap().len(), 2);
        assert_eq!(paged.fetch_page(3).unwrap().len(), 1);
        assert!(paged.fetch_page(4).unwrap().is_empty());
        assert_eq!(paged.stats().offset_queries, 0);
        assert_eq!(paged.page_count().unwrap(), 3);
        assert_eq!(paged.stats().count_calls, 0);
    }

    #[test]
    fn test_long_jump_uses_one_offset_query() {
        let config = PagingConfig::new().with_max_cursor_walk(1);
        let mut paged = PagedQuery::new(store(20).query("Item"), 2)
            .unwrap()
            .with_config(config);
        paged.order("n").unwrap();

        let records = paged.fetch_page(7).unwrap();
        assert_eq!(records[0].get("n"), Some(&Value::Int64(12)));
        assert_eq!(paged.stats().offset_queries, 1);

        // Page 8 starts at the cursor recorded after page 7.
        paged.fetch_page(8).unwrap();
        assert_eq!(paged.stats().offset_queries, 1);
    }

    #[test]
    fn test_page_beyond_any_offset_is_empty() {
        let mut paged = PagedQuery::new(store(6).query("Item"), 2).unwrap();
        assert!(paged.fetch_page(usize::MAX).unwrap().is_empty());
        assert_eq!(paged.stats().offset_queries, 0);

        paged.fetch_page(1).unwrap();
        paged.fetch_page(2).unwrap();
        assert!(paged.fetch_page(usize::MAX).unwrap().is_empty());
        assert!(!paged.has_page(usize::MAX).unwrap());
    }

    #[test]
    fn test_mutation_invalidates_identity_and_cache() {
        let mut paged = PagedQuery::new(store(5).query("Item"), 2).unwrap();
        let before = paged.id().unwrap();
        paged.fetch_page(1).unwrap();
        assert_eq!(paged.cursors().len(), 2);

        paged.filter("n >", 1i64).unwrap().order("-n").unwrap();
        assert_ne!(paged.id().unwrap(), before);
        assert_eq!(paged.cursors(), &[None]);

        let records = paged.fetch_page(1).unwrap();
        assert_eq!(records[0].get("n"), Some(&Value::Int64(4)));
    }

    #[test]
    fn test_clear_keeps_identity() {
        let mut paged = PagedQuery::new(store(5).query("Item"), 2).unwrap();
        let id = paged.id().unwrap();
        paged.fetch_page_with(PageRequest::new(2).clear()).unwrap();
        paged.clear();
        assert_eq!(paged.id().unwrap(), id);
    }

    #[test]
    fn test_set_page_size_clears() {
        let mut paged = PagedQuery::new(store(5).query("Item"), 2).unwrap();
        paged.fetch_page(1).unwrap();
        paged.set_page_size(2usize).unwrap();
        assert_eq!(paged.cursors().len(), 2);

        paged.set_page_size(3).unwrap();
        assert_eq!(paged.cursors(), &[None]);
        assert_eq!(paged.page_size().get(), 3);
        assert!(paged.set_page_size(0).is_err());
        assert_eq!(paged.page_size().get(), 3);
    }

    #[test]
    fn test_fetch_requires_limit() {
        let mut paged = PagedQuery::new(store(5).query("Item"), 2).unwrap();
        assert!(matches!(
            paged.fetch(FetchOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(paged.fetch(FetchOptions::limit(4)).unwrap().len(), 4);
        assert_eq!(paged.count(Some(3)).unwrap(), 3);
    }

    #[test]
    fn test_links() {
        let mut paged = PagedQuery::new(store(7).query("Item"), 2).unwrap();
        let links = paged.links(2, "/items", "page").unwrap();
        assert_eq!(links.len(), 6);
        assert_eq!(links[1].url, "/items?page=1");
    }
}
