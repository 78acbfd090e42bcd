//! Shared cursor stores.
//!
//! A cursor store lets a later query instance with the same identity and
//! page size resume from cursors an earlier instance discovered, instead of
//! re-deriving them with offset queries.

use std::fmt;
use std::path::Path;

use dashmap::DashMap;
use pagewise_proto::Cursor;
use tracing::debug;

use crate::error::Result;
use crate::query::QueryIdentity;

/// Name of the sled tree holding cursors.
const CURSOR_TREE: &str = "cursors";

/// Address of one stored cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorKey {
    /// Identity of the query that produced the cursor.
    pub query: QueryIdentity,
    /// Page size the cursor was recorded under.
    pub page_size: usize,
    /// Cursor index: the cursor sits after page `index`.
    pub index: usize,
}

impl CursorKey {
    /// Create a cursor key.
    pub fn new(query: QueryIdentity, page_size: usize, index: usize) -> Self {
        Self {
            query,
            page_size,
            index,
        }
    }

    /// Binary form: identity bytes, then page size and index as big-endian
    /// u64, so keys of one query sort together by page size and index.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(48);
        out.extend_from_slice(self.query.as_bytes());
        out.extend_from_slice(&(self.page_size as u64).to_be_bytes());
        out.extend_from_slice(&(self.index as u64).to_be_bytes());
        out
    }
}

impl fmt::Display for CursorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.query, self.page_size, self.index)
    }
}

/// Storage for cursors shared between query instances.
pub trait CursorStore: Send + Sync {
    /// Look up a cursor.
    fn get(&self, key: &CursorKey) -> Result<Option<Cursor>>;

    /// Store a cursor, replacing any previous one under the same key.
    fn put(&self, key: &CursorKey, cursor: &Cursor) -> Result<()>;
}

/// Process-local cursor store.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    entries: DashMap<CursorKey, Cursor>,
}

impl MemoryCursorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cursors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CursorStore for MemoryCursorStore {
    fn get(&self, key: &CursorKey) -> Result<Option<Cursor>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &CursorKey, cursor: &Cursor) -> Result<()> {
        self.entries.insert(*key, cursor.clone());
        Ok(())
    }
}

/// Durable cursor store on a sled tree.
pub struct SledCursorStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledCursorStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::Config::new()
            .path(path.as_ref())
            .use_compression(true)
            .open()?;
        let tree = db.open_tree(CURSOR_TREE)?;
        debug!(path = %path.as_ref().display(), "opened cursor store");
        Ok(Self { db, tree })
    }

    /// Number of stored cursors.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl CursorStore for SledCursorStore {
    fn get(&self, key: &CursorKey) -> Result<Option<Cursor>> {
        Ok(self
            .tree
            .get(key.encode())?
            .map(|bytes| Cursor::from_bytes(bytes.to_vec())))
    }

    fn put(&self, key: &CursorKey, cursor: &Cursor) -> Result<()> {
        self.tree.insert(key.encode(), cursor.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewise_proto::{QueryShape, QuerySpec};
    use tempfile::TempDir;

    fn key(index: usize) -> CursorKey {
        let shape = QueryShape::Chainable(QuerySpec::new("Person"));
        CursorKey::new(QueryIdentity::of(&shape).unwrap(), 2, index)
    }

    #[test]
    fn test_key_encoding_orders_by_index() {
        let a = key(1).encode();
        let b = key(2).encode();
        assert_eq!(a.len(), 48);
        assert!(a < b);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCursorStore::new();
        assert!(store.get(&key(1)).unwrap().is_none());

        store.put(&key(1), &Cursor::from_bytes(vec![1])).unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), Some(Cursor::from_bytes(vec![1])));
        assert!(store.get(&key(2)).unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sled_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursors");

        {
            let store = SledCursorStore::open(&path).unwrap();
            store.put(&key(3), &Cursor::from_bytes(vec![7, 7])).unwrap();
            store.flush().unwrap();
        }

        let store = SledCursorStore::open(&path).unwrap();
        assert_eq!(
            store.get(&key(3)).unwrap(),
            Some(Cursor::from_bytes(vec![7, 7]))
        );
        assert_eq!(store.len(), 1);
    }
}
