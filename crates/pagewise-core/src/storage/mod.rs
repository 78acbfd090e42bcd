//! In-memory reference backend.
//!
//! [`MemoryStore`] keeps entities in a key-ordered map and hands out
//! [`MemoryQuery`] values that implement [`BaseQuery`](crate::query::BaseQuery)
//! with real resumable cursors. It is the backend used by the CLI and the
//! test suites, and its per-kind instantiation counters make batching
//! behaviour observable.

mod entity;
mod gql;
mod query;
mod store;

pub use entity::Entity;
pub use query::MemoryQuery;
pub use store::MemoryStore;
