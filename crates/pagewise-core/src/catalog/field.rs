//! Field definitions for entity schemas.

use std::fmt;

/// Data type of a field, as far as prefetching cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Plain property value.
    Scalar,
    /// Key of an entity of the given kind.
    Reference {
        /// Kind of the referenced entity.
        target: String,
    },
}

/// A field definition within an entity schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether reflection may select this field for prefetching.
    pub prefetch: bool,
}

impl FieldSchema {
    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Scalar,
            prefetch: false,
        }
    }

    /// Create a reference field pointing at entities of `target` kind.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Reference {
                target: target.into(),
            },
            prefetch: true,
        }
    }

    /// Exclude this field from reflected prefetch lists.
    pub fn no_prefetch(mut self) -> Self {
        self.prefetch = false;
        self
    }

    /// Check if this is a reference field.
    pub fn is_reference(&self) -> bool {
        matches!(self.field_type, FieldType::Reference { .. })
    }
}

/// Something a prefetching query can resolve in bulk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrefetchField {
    /// The entity named by the record key's parent.
    Parent,
    /// The entity referenced by a named field.
    Field(String),
}

impl PrefetchField {
    /// Field name, or `"parent"`.
    pub fn name(&self) -> &str {
        match self {
            PrefetchField::Parent => "parent",
            PrefetchField::Field(name) => name,
        }
    }
}

impl From<&str> for PrefetchField {
    /// `"parent"` selects the key's parent; anything else names a field.
    fn from(name: &str) -> Self {
        match name {
            "parent" => PrefetchField::Parent,
            other => PrefetchField::Field(other.to_string()),
        }
    }
}

impl From<String> for PrefetchField {
    fn from(name: String) -> Self {
        PrefetchField::from(name.as_str())
    }
}

impl From<&FieldSchema> for PrefetchField {
    fn from(field: &FieldSchema) -> Self {
        PrefetchField::Field(field.name.clone())
    }
}

impl fmt::Display for PrefetchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_builders() {
        let topic = FieldSchema::reference("topic", "PostTopic");
        assert!(topic.is_reference());
        assert!(topic.prefetch);
        assert!(!topic.clone().no_prefetch().prefetch);

        let title = FieldSchema::scalar("title");
        assert!(!title.is_reference());
    }

    #[test]
    fn test_prefetch_field_from_name() {
        assert_eq!(PrefetchField::from("parent"), PrefetchField::Parent);
        assert_eq!(
            PrefetchField::from("topic"),
            PrefetchField::Field("topic".into())
        );
        assert_eq!(PrefetchField::Parent.to_string(), "parent");
        assert_eq!(
            PrefetchField::from(&FieldSchema::reference("role", "Role")),
            PrefetchField::Field("role".into())
        );
    }
}
