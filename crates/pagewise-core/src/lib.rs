//! Pagewise core: page-addressed queries with cursor caching, batched
//! reference prefetching, and page links.
//!
//! The layers compose over any [`BaseQuery`](query::BaseQuery):
//!
//! - [`PagedQuery`](paging::PagedQuery) addresses results by page number and
//!   caches the cursors it discovers, optionally sharing them through a
//!   [`CursorStore`](paging::CursorStore).
//! - [`PrefetchingQuery`](prefetch::PrefetchingQuery) resolves the
//!   references of each fetched batch in bulk.
//! - [`PageLinks`](paging::PageLinks) renders navigation links.
//!
//! [`storage`] provides an in-memory backend with real cursors.

pub mod catalog;
pub mod config;
pub mod error;
pub mod paging;
pub mod prefetch;
pub mod query;
pub mod storage;

pub use catalog::{Catalog, EntitySchema, FieldSchema, FieldType, PrefetchField};
pub use config::PagingConfig;
pub use error::{Error, Result};
pub use paging::{
    page_links, CursorCache, CursorKey, CursorStore, LinkKind, MemoryCursorStore, PageLink,
    PageLinks, PageRequest, PageSize, PagedQuery, PagingStatsSnapshot, SledCursorStore,
};
pub use prefetch::{PrefetchingQuery, ReferenceRecord, ReferenceResolver};
pub use query::{BaseQuery, FetchOptions, FetchRequest, QueryIdentity};
pub use storage::{Entity, MemoryQuery, MemoryStore};
