//! Entity records returned by the in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use pagewise_proto::{Key, Value};

use super::store::MemoryStore;
use crate::catalog::PrefetchField;
use crate::error::Result;
use crate::prefetch::ReferenceRecord;

/// A materialised entity: its key, its property values, and any referenced
/// entities already resolved onto it.
#[derive(Debug, Clone)]
pub struct Entity {
    key: Key,
    fields: Vec<(String, Value)>,
    resolved: HashMap<PrefetchField, Arc<Entity>>,
}

impl Entity {
    /// Create an entity with no fields.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            fields: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn from_parts(key: Key, fields: Vec<(String, Value)>) -> Self {
        Self {
            key,
            fields,
            resolved: HashMap::new(),
        }
    }

    /// Set a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == field) {
            Some((_, v)) => *v = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Entity key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Entity kind.
    pub fn kind(&self) -> &str {
        self.key.kind()
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == field).map(|(_, v)| v)
    }

    /// All field values.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// A reference already resolved onto this entity.
    pub fn resolved(&self, field: &PrefetchField) -> Option<&Arc<Entity>> {
        self.resolved.get(field)
    }

    /// Follow a reference, using the prefetched target when present and
    /// loading it from `store` otherwise.
    pub fn dereference(
        &self,
        field: impl Into<PrefetchField>,
        store: &MemoryStore,
    ) -> Result<Option<Arc<Entity>>> {
        let field = field.into();
        if let Some(target) = self.resolved.get(&field) {
            return Ok(Some(Arc::clone(target)));
        }
        match self.reference(&field) {
            Some(key) => store.get(&key),
            None => Ok(None),
        }
    }
}

impl PartialEq for Entity {
    /// Entities compare by key and stored fields; resolved references are a
    /// cache and do not take part.
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.fields == other.fields
    }
}

impl ReferenceRecord for Entity {
    type Target = Arc<Entity>;

    fn kind(&self) -> &str {
        self.key.kind()
    }

    fn has_parent(&self) -> bool {
        self.key.parent().is_some()
    }

    fn reference(&self, field: &PrefetchField) -> Option<Key> {
        match field {
            PrefetchField::Parent => self.key.parent(),
            PrefetchField::Field(name) => self.get(name).and_then(Value::as_key).cloned(),
        }
    }

    fn attach(&mut self, field: &PrefetchField, target: Self::Target) {
        self.resolved.insert(field.clone(), target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces() {
        let mut entity = Entity::new(Key::new("Person", "kate")).with("name", "Kate");
        entity.set("name", "Katherine");
        assert_eq!(entity.get("name"), Some(&Value::from("Katherine")));
        assert_eq!(entity.fields().len(), 1);
    }

    #[test]
    fn test_references() {
        let bill = Key::new("User", "bill");
        let topic = bill.child("PostTopic", "t1");
        let post = Entity::new(bill.child("Post", "p1")).with("topic", topic.clone());

        assert!(post.has_parent());
        assert_eq!(post.reference(&PrefetchField::Parent), Some(bill));
        assert_eq!(post.reference(&PrefetchField::from("topic")), Some(topic));
        assert_eq!(post.reference(&PrefetchField::from("title")), None);
    }

    #[test]
    fn test_equality_ignores_resolved() {
        let key = Key::new("User", "bill");
        let mut a = Entity::new(key.child("Post", "p1"));
        let b = a.clone();
        a.attach(&PrefetchField::Parent, Arc::new(Entity::new(key)));
        assert_eq!(a, b);
    }
}
