//! Page-addressed querying.
//!
//! [`PagedQuery`] turns a cursor-capable [`BaseQuery`](crate::query::BaseQuery)
//! into random access by page number, caching the cursors it discovers in a
//! [`CursorCache`] and optionally sharing them through a [`CursorStore`].
//! [`PageLinks`] renders navigation links for a page count.

mod cache;
mod links;
mod page_size;
mod paged;
mod store;

pub use cache::{CursorCache, PagingStats, PagingStatsSnapshot};
pub use links::{page_links, LinkKind, PageLink, PageLinks};
pub use page_size::PageSize;
pub use paged::{PageRequest, PagedQuery};
pub use store::{CursorKey, CursorStore, MemoryCursorStore, SledCursorStore};
