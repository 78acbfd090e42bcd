//! Backend query capabilities and query identities.

mod backend;
mod identity;

pub use backend::{BaseQuery, FetchOptions, FetchRequest};
pub use identity::QueryIdentity;
