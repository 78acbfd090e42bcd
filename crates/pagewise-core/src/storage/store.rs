//! In-memory entity store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pagewise_proto::{Key, QuerySpec, Value};
use tracing::trace;

use super::entity::Entity;
use super::query::MemoryQuery;
use crate::catalog::{Catalog, EntitySchema};
use crate::error::Result;
use crate::prefetch::ReferenceResolver;

/// Thread-safe in-memory datastore.
///
/// Cloning the store yields another handle onto the same data. Every entity
/// materialised out of the store, whether by key lookup or by a query, is
/// counted per kind, so callers can observe how many loads a code path
/// performs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    entities: RwLock<BTreeMap<Key, Vec<(String, Value)>>>,
    catalog: RwLock<Catalog>,
    instantiations: Mutex<HashMap<String, u64>>,
}

impl MemoryStore {
    /// Create an empty store with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store using the given catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        *store.inner.catalog.write() = catalog;
        store
    }

    /// Register or replace an entity schema.
    pub fn register_schema(&self, schema: EntitySchema) {
        self.inner.catalog.write().register(schema);
    }

    /// Insert or replace an entity.
    pub fn put(&self, entity: &Entity) {
        self.inner
            .entities
            .write()
            .insert(entity.key().clone(), entity.fields().to_vec());
    }

    /// Remove an entity. Returns whether it existed.
    pub fn delete(&self, key: &Key) -> bool {
        self.inner.entities.write().remove(key).is_some()
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.inner.entities.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load one entity by key.
    pub fn get(&self, key: &Key) -> Result<Option<Arc<Entity>>> {
        let fields = self.inner.entities.read().get(key).cloned();
        Ok(fields.map(|fields| {
            self.count_instantiations(key.kind(), 1);
            Arc::new(Entity::from_parts(key.clone(), fields))
        }))
    }

    /// Load several entities in one pass. Results line up with `keys`.
    pub fn get_many(&self, keys: &[Key]) -> Result<Vec<Option<Arc<Entity>>>> {
        let guard = self.inner.entities.read();
        let mut loaded: HashMap<&Key, Arc<Entity>> = HashMap::new();
        let mut out = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(entity) = loaded.get(key) {
                out.push(Some(Arc::clone(entity)));
                continue;
            }
            match guard.get(key) {
                Some(fields) => {
                    self.count_instantiations(key.kind(), 1);
                    let entity = Arc::new(Entity::from_parts(key.clone(), fields.clone()));
                    loaded.insert(key, Arc::clone(&entity));
                    out.push(Some(entity));
                }
                None => out.push(None),
            }
        }

        trace!(requested = keys.len(), loaded = loaded.len(), "batch get");
        Ok(out)
    }

    /// Start a chainable query over a kind.
    pub fn query(&self, kind: impl Into<String>) -> MemoryQuery {
        MemoryQuery::new(self.clone(), QuerySpec::new(kind))
    }

    /// Build a fixed query from GQL-like text and named parameters, e.g.
    /// `"WHERE ANCESTOR IS :parent ORDER BY birthdate, name"`.
    pub fn gql(
        &self,
        kind: impl Into<String>,
        text: impl Into<String>,
        params: Vec<(String, Value)>,
    ) -> Result<MemoryQuery> {
        MemoryQuery::fixed(self.clone(), kind.into(), text.into(), params)
    }

    /// Number of entities of `kind` materialised since the last reset.
    pub fn instantiations(&self, kind: &str) -> u64 {
        self.inner
            .instantiations
            .lock()
            .get(kind)
            .copied()
            .unwrap_or(0)
    }

    /// Reset all instantiation counters.
    pub fn reset_instantiations(&self) {
        self.inner.instantiations.lock().clear();
    }

    /// Entities matching a query configuration, in key order.
    pub(crate) fn scan(&self, spec: &QuerySpec) -> Vec<(Key, Vec<(String, Value)>)> {
        let guard = self.inner.entities.read();
        guard
            .iter()
            .filter(|(key, _)| key.kind() == spec.kind)
            .filter(|(key, _)| {
                spec.ancestor
                    .as_ref()
                    .map_or(true, |ancestor| ancestor.is_ancestor_of(key))
            })
            .filter(|(_, fields)| {
                spec.filters.iter().all(|filter| {
                    let value = fields
                        .iter()
                        .find(|(n, _)| *n == filter.field)
                        .map(|(_, v)| v);
                    filter.matches(value)
                })
            })
            .map(|(key, fields)| (key.clone(), fields.clone()))
            .collect()
    }

    pub(crate) fn count_instantiations(&self, kind: &str, n: u64) {
        *self
            .inner
            .instantiations
            .lock()
            .entry(kind.to_string())
            .or_insert(0) += n;
    }
}

impl ReferenceResolver for MemoryStore {
    type Target = Arc<Entity>;

    fn schema(&self, kind: &str) -> Option<EntitySchema> {
        self.inner.catalog.read().get(kind).cloned()
    }

    fn resolve_many(&self, keys: &[Key]) -> Result<Vec<Option<Self::Target>>> {
        self.get_many(keys)
    }
}
