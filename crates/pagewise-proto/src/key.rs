//! Hierarchical entity keys.

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;

/// One `(kind, name)` step of a key path.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub struct KeySegment {
    /// Entity kind.
    pub kind: String,
    /// Name of the entity, unique among siblings of the same kind.
    pub name: String,
}

/// A key identifying one entity.
///
/// Keys are paths: every segment but the last names an ancestor. An entity
/// created under a parent carries the parent's full path as its prefix, which
/// is what ancestor queries match against.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub struct Key {
    /// Path segments, root first.
    pub path: Vec<KeySegment>,
}

impl Key {
    /// Create a root key.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: vec![KeySegment {
                kind: kind.into(),
                name: name.into(),
            }],
        }
    }

    /// Create a key for a child entity under this key.
    pub fn child(&self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(KeySegment {
            kind: kind.into(),
            name: name.into(),
        });
        Self { path }
    }

    /// Kind of the entity this key names.
    pub fn kind(&self) -> &str {
        self.path.last().map(|s| s.kind.as_str()).unwrap_or("")
    }

    /// Name of the entity this key names.
    pub fn name(&self) -> &str {
        self.path.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// The parent key, if this key is not a root.
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Check whether `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        !self.path.is_empty() && other.path.starts_with(&self.path)
    }

    /// Parse the `Kind:name/Kind:name` form produced by `Display`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut path = Vec::new();
        for part in text.split('/') {
            let (kind, name) = part
                .split_once(':')
                .ok_or_else(|| Error::InvalidExpression(format!("malformed key segment '{part}'")))?;
            if kind.is_empty() || name.is_empty() {
                return Err(Error::InvalidExpression(format!(
                    "empty kind or name in key segment '{part}'"
                )));
            }
            path.push(KeySegment {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
        Ok(Self { path })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}:{}", segment.kind, segment.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_parent() {
        let warwick = Key::new("Person", "warwick");
        let alex = warwick.child("Person", "alex");

        assert_eq!(alex.kind(), "Person");
        assert_eq!(alex.name(), "alex");
        assert_eq!(alex.parent(), Some(warwick.clone()));
        assert_eq!(warwick.parent(), None);
    }

    #[test]
    fn test_ancestor_includes_self() {
        let warwick = Key::new("Person", "warwick");
        let alex = warwick.child("Person", "alex");
        let marilyn = Key::new("Person", "marilyn");

        assert!(warwick.is_ancestor_of(&warwick));
        assert!(warwick.is_ancestor_of(&alex));
        assert!(!alex.is_ancestor_of(&warwick));
        assert!(!marilyn.is_ancestor_of(&alex));
    }

    #[test]
    fn test_display_parse() {
        let key = Key::new("User", "bill").child("Post", "p1");
        assert_eq!(key.to_string(), "User:bill/Post:p1");
        assert_eq!(Key::parse("User:bill/Post:p1").unwrap(), key);
        assert!(Key::parse("User").is_err());
        assert!(Key::parse("User:").is_err());
    }
}
