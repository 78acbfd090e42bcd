//! Entity schemas.

use super::field::{FieldSchema, PrefetchField};

/// Declared shape of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity kind.
    pub kind: String,
    /// Field definitions.
    pub fields: Vec<FieldSchema>,
    /// Prefetch list declared for this kind, overriding reflection.
    pub prefetch: Option<Vec<PrefetchField>>,
}

impl EntitySchema {
    /// Create a schema with no fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Vec::new(),
            prefetch: None,
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare the prefetch list for this kind.
    pub fn with_prefetch<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<PrefetchField>,
    {
        self.prefetch = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Reference fields eligible for reflected prefetching, in declaration
    /// order.
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.is_reference() && f.prefetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_fields_skip_no_prefetch() {
        let schema = EntitySchema::new("User")
            .with_field(FieldSchema::scalar("name"))
            .with_field(FieldSchema::reference("role", "SecurityRole"))
            .with_field(FieldSchema::reference("avatar", "Blob").no_prefetch());

        let names: Vec<_> = schema.reference_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["role"]);
        assert!(schema.get_field("avatar").is_some());
        assert!(schema.prefetch.is_none());
    }

    #[test]
    fn test_declared_prefetch() {
        let schema = EntitySchema::new("SecurityRole").with_prefetch(["parent"]);
        assert_eq!(schema.prefetch, Some(vec![PrefetchField::Parent]));
    }
}
