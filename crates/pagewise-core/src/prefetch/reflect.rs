//! Capabilities the prefetch layer consumes from records and backends.

use pagewise_proto::Key;

use crate::catalog::{EntitySchema, PrefetchField};
use crate::error::Result;

/// A record whose references can be read and resolved in place.
pub trait ReferenceRecord {
    /// Resolved reference target.
    type Target: Clone;

    /// Entity kind, used to look up the record's schema.
    fn kind(&self) -> &str;

    /// Whether the record has a parent entity.
    fn has_parent(&self) -> bool;

    /// Key referenced by `field`, if set.
    fn reference(&self, field: &PrefetchField) -> Option<Key>;

    /// Attach a resolved target so later dereferences need no lookup.
    fn attach(&mut self, field: &PrefetchField, target: Self::Target);
}

/// Schema reflection and batch key resolution.
pub trait ReferenceResolver {
    /// Resolved reference target.
    type Target;

    /// Declared schema of `kind`, if known.
    fn schema(&self, kind: &str) -> Option<EntitySchema>;

    /// Resolve many keys in one round trip. The result lines up with `keys`;
    /// keys naming no entity yield `None`.
    fn resolve_many(&self, keys: &[Key]) -> Result<Vec<Option<Self::Target>>>;
}

/// Fields to prefetch when none were set explicitly: the schema's declared
/// list if it has one, otherwise its prefetchable reference fields followed
/// by the parent when the record has one.
pub fn default_prefetch_fields(schema: Option<&EntitySchema>, has_parent: bool) -> Vec<PrefetchField> {
    if let Some(declared) = schema.and_then(|s| s.prefetch.as_ref()) {
        return declared.clone();
    }
    let mut fields: Vec<PrefetchField> = schema
        .map(|s| s.reference_fields().map(PrefetchField::from).collect())
        .unwrap_or_default();
    if has_parent && !fields.contains(&PrefetchField::Parent) {
        fields.push(PrefetchField::Parent);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldSchema;

    #[test]
    fn test_declared_list_wins() {
        let schema = EntitySchema::new("SecurityRole")
            .with_field(FieldSchema::reference("owner", "User"))
            .with_prefetch(["parent"]);
        assert_eq!(
            default_prefetch_fields(Some(&schema), false),
            vec![PrefetchField::Parent]
        );
    }

    #[test]
    fn test_reflected_references_and_parent() {
        let schema = EntitySchema::new("Post")
            .with_field(FieldSchema::scalar("title"))
            .with_field(FieldSchema::reference("topic", "PostTopic"))
            .with_field(FieldSchema::reference("image", "Blob").no_prefetch());

        assert_eq!(
            default_prefetch_fields(Some(&schema), true),
            vec![PrefetchField::from("topic"), PrefetchField::Parent]
        );
        assert_eq!(
            default_prefetch_fields(Some(&schema), false),
            vec![PrefetchField::from("topic")]
        );
    }

    #[test]
    fn test_no_schema() {
        assert_eq!(default_prefetch_fields(None, true), vec![PrefetchField::Parent]);
        assert!(default_prefetch_fields(None, false).is_empty());
    }
}
