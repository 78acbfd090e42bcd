//! Opaque resumption tokens.

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;

/// A backend-issued token marking a resumable position in an ordered result
/// set.
///
/// The paging layer never looks inside a cursor; it only stores it and hands
/// it back to the backend that issued it.
#[derive(
    Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Cursor(Vec<u8>);

impl Cursor {
    /// Wrap raw token bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex form, suitable for string-keyed stores.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Decode the hex form produced by [`Cursor::to_hex`].
    pub fn from_hex(text: &str) -> Result<Self, Error> {
        hex::decode(text)
            .map(Self)
            .map_err(|e| Error::Deserialization(format!("invalid cursor: {e}")))
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        if hex.len() > 16 {
            write!(f, "Cursor({}..)", &hex[..16])
        } else {
            write!(f, "Cursor({hex})")
        }
    }
}
