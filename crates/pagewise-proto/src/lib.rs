//! pagewise protocol types.
//!
//! This crate defines the plain data shared by every layer of pagewise:
//!
//! - [`value`] - Property values compared by filters and stored on records
//! - [`key`] - Hierarchical entity keys used for references and ancestors
//! - [`query`] - Filters, order clauses and query shapes
//! - [`cursor`] - Opaque resumption tokens issued by a backend
//! - [`error`] - Protocol error types
//!
//! Query shapes derive `rkyv::Archive` so they have one canonical byte
//! encoding, which is what query identities are hashed from.

pub mod cursor;
pub mod error;
pub mod key;
pub mod query;
pub mod value;

pub use cursor::Cursor;
pub use error::Error;
pub use key::{Key, KeySegment};
pub use query::{Filter, FilterOp, OrderDirection, OrderSpec, QueryShape, QuerySpec};
pub use value::Value;
