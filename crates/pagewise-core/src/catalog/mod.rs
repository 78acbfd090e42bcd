//! Entity schemas and the reflection they support.
//!
//! A [`Catalog`] maps entity kinds to their [`EntitySchema`]. Prefetching
//! uses it to enumerate a record type's reference-valued fields when no
//! explicit prefetch list is given.

mod entity;
mod field;

use std::collections::HashMap;

pub use entity::EntitySchema;
pub use field::{FieldSchema, FieldType, PrefetchField};

/// Registry of entity schemas by kind.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: HashMap<String, EntitySchema>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous schema for the kind.
    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.kind.clone(), schema);
    }

    /// Register a schema, builder style.
    pub fn with_schema(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    /// Look up a schema.
    pub fn get(&self, kind: &str) -> Option<&EntitySchema> {
        self.schemas.get(kind)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let catalog = Catalog::new()
            .with_schema(EntitySchema::new("Post").with_field(FieldSchema::scalar("title")))
            .with_schema(EntitySchema::new("PostTopic"));

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("Post").unwrap().get_field("title").is_some());
        assert!(catalog.get("Missing").is_none());
    }
}
