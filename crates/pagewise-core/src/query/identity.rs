//! Query identities.
//!
//! An identity is a blake3 digest of a query shape's canonical encoding. Two
//! queries built with the same filters, orders and ancestor, applied in the
//! same sequence, hash to the same identity in any process; adding a clause
//! or changing any value changes it. Fixed queries hash their literal text
//! and bound parameters.

use std::fmt;

use pagewise_proto::QueryShape;

use crate::error::Result;

/// Stable fingerprint of a query's configuration, used as a cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryIdentity([u8; 32]);

impl QueryIdentity {
    /// Compute the identity of a query shape.
    pub fn of(shape: &QueryShape) -> Result<Self> {
        let bytes = shape.canonical_bytes()?;
        Ok(Self(*blake3::hash(&bytes).as_bytes()))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex form of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryIdentity({})", &self.to_hex()[..12])
    }
}
