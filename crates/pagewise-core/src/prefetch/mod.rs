//! Batched reference prefetching.
//!
//! Dereferencing a reference field on each record of a page costs one
//! lookup per record. [`PrefetchingQuery`] collects the distinct keys a
//! fetched batch references, resolves them with one batch lookup per field,
//! and attaches the results to the records.

mod query;
mod reflect;

pub use query::{PrefetchStats, PrefetchingQuery};
pub use reflect::{default_prefetch_fields, ReferenceRecord, ReferenceResolver};
