//! Per-query cursor cache and paging counters.

use pagewise_proto::Cursor;
use serde::Serialize;

/// What a [`PagedQuery`](super::PagedQuery) knows about its result set.
///
/// Index `i` of the cursor list holds the cursor positioned after page `i`,
/// i.e. the start of page `i + 1`. Index 0 is the start-of-results sentinel
/// and is always `None`. A cursor is recorded only after a full page, so
/// every recorded index names a page that exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorCache {
    cursors: Vec<Option<Cursor>>,
    total_count: Option<usize>,
    max_known_page: usize,
    first_empty_page: Option<usize>,
}

impl Default for CursorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorCache {
    /// Create an empty cache holding only the start sentinel.
    pub fn new() -> Self {
        Self {
            cursors: vec![None],
            total_count: None,
            max_known_page: 0,
            first_empty_page: None,
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// The cursor list, sentinel included.
    pub fn cursors(&self) -> &[Option<Cursor>] {
        &self.cursors
    }

    /// Cursor recorded at `index`, if any. Index 0 never holds one.
    pub fn cursor_at(&self, index: usize) -> Option<&Cursor> {
        self.cursors.get(index).and_then(Option::as_ref)
    }

    /// Nearest known start position strictly before `page`: the page it
    /// starts and its cursor. Falls back to page 1 and the start of results.
    pub fn nearest_start(&self, page: usize) -> (usize, Option<Cursor>) {
        let upper = page.saturating_sub(1).min(self.cursors.len().saturating_sub(1));
        (1..=upper)
            .rev()
            .find_map(|index| self.cursor_at(index).map(|c| (index + 1, Some(c.clone()))))
            .unwrap_or((1, None))
    }

    /// Record the cursor after `page`. Returns whether this index was not
    /// already known.
    pub fn record(&mut self, page: usize, cursor: Cursor) -> bool {
        if page == 0 {
            return false;
        }
        if self.cursors.len() <= page {
            self.cursors.resize(page + 1, None);
        }
        let fresh = self.cursors[page].is_none();
        self.cursors[page] = Some(cursor);
        fresh
    }

    /// Fold the outcome of fetching `page` into what is known about the
    /// result set.
    pub fn observe(&mut self, page: usize, returned: usize, page_size: usize) {
        if returned > 0 {
            self.max_known_page = self.max_known_page.max(page);
        }
        if returned == 0 {
            self.first_empty_page = Some(self.first_empty_page.map_or(page, |p| p.min(page)));
        } else if returned < page_size && self.total_count.is_none() {
            self.total_count = Some((page - 1) * page_size + returned);
        }
    }

    /// Memoised record count.
    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    /// Memoise the record count.
    pub fn set_total_count(&mut self, total: usize) {
        self.total_count = Some(total);
    }

    /// Highest page known to hold at least one record.
    pub fn max_known_page(&self) -> usize {
        self.max_known_page
    }

    /// Whether `page` exists, if that can be told without the backend.
    pub fn page_exists(&self, page: usize, page_size: usize) -> Option<bool> {
        if page == 0 {
            return Some(false);
        }
        if page <= self.max_known_page {
            return Some(true);
        }
        if let Some(total) = self.total_count {
            return Some(page <= total.div_ceil(page_size));
        }
        if self.first_empty_page.is_some_and(|empty| page >= empty) {
            return Some(false);
        }
        None
    }
}

/// Counters describing how a paged query reached its pages.
#[derive(Debug, Default, Clone)]
pub struct PagingStats {
    offset_queries: u64,
    count_calls: u64,
    cursor_walks: u64,
    persists: u64,
    restores: u64,
}

impl PagingStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_offset_query(&mut self) {
        self.offset_queries += 1;
    }

    pub(crate) fn record_count_call(&mut self) {
        self.count_calls += 1;
    }

    pub(crate) fn record_cursor_walk(&mut self) {
        self.cursor_walks += 1;
    }

    pub(crate) fn record_persist(&mut self) {
        self.persists += 1;
    }

    pub(crate) fn record_restore(&mut self) {
        self.restores += 1;
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self) -> PagingStatsSnapshot {
        PagingStatsSnapshot {
            offset_queries: self.offset_queries,
            count_calls: self.count_calls,
            cursor_walks: self.cursor_walks,
            persists: self.persists,
            restores: self.restores,
        }
    }
}

/// Point-in-time copy of [`PagingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PagingStatsSnapshot {
    /// Backend fetches positioned with a non-zero offset.
    pub offset_queries: u64,
    /// Backend count calls.
    pub count_calls: u64,
    /// Page requests served by walking forward from a known cursor.
    pub cursor_walks: u64,
    /// Cursors written to the cursor store.
    pub persists: u64,
    /// Cursors read back from the cursor store.
    pub restores: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(n: u8) -> Cursor {
        Cursor::from_bytes(vec![n])
    }

    #[test]
    fn test_starts_with_sentinel() {
        let cache = CursorCache::new();
        assert_eq!(cache.cursors(), &[None]);
        assert_eq!(cache.nearest_start(5), (1, None));
    }

    #[test]
    fn test_record_and_nearest() {
        let mut cache = CursorCache::new();
        assert!(cache.record(2, cursor(2)));
        assert!(!cache.record(2, cursor(2)));
        assert_eq!(cache.cursors().len(), 3);
        assert_eq!(cache.cursor_at(1), None);

        assert_eq!(cache.nearest_start(5), (3, Some(cursor(2))));
        assert_eq!(cache.nearest_start(3), (3, Some(cursor(2))));
        assert_eq!(cache.nearest_start(2), (1, None));
        assert!(!cache.record(0, cursor(0)));
    }

    #[test]
    fn test_short_page_fixes_total() {
        let mut cache = CursorCache::new();
        cache.observe(3, 1, 2);
        assert_eq!(cache.total_count(), Some(5));
        assert_eq!(cache.page_exists(3, 2), Some(true));
        assert_eq!(cache.page_exists(4, 2), Some(false));
    }

    #[test]
    fn test_empty_page_bounds_result_set() {
        let mut cache = CursorCache::new();
        cache.observe(1, 2, 2);
        cache.observe(4, 0, 2);
        assert_eq!(cache.total_count(), None);
        assert_eq!(cache.page_exists(1, 2), Some(true));
        assert_eq!(cache.page_exists(3, 2), None);
        assert_eq!(cache.page_exists(4, 2), Some(false));
        assert_eq!(cache.page_exists(9, 2), Some(false));
    }

    #[test]
    fn test_clear() {
        let mut cache = CursorCache::new();
        cache.record(1, cursor(1));
        cache.set_total_count(10);
        cache.clear();
        assert_eq!(cache, CursorCache::new());
    }

    #[test]
    fn test_stats_snapshot() {
        let mut stats = PagingStats::new();
        stats.record_offset_query();
        stats.record_count_call();
        stats.record_count_call();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.offset_queries, 1);
        assert_eq!(snapshot.count_calls, 2);
        assert_eq!(snapshot.persists, 0);
    }
}
