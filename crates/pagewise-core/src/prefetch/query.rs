//! Batched reference resolution on fetched records.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use pagewise_proto::{Cursor, Filter, Key, OrderSpec, QueryShape, Value};
use tracing::{debug, instrument};

use super::reflect::{default_prefetch_fields, ReferenceRecord, ReferenceResolver};
use crate::catalog::PrefetchField;
use crate::error::{Error, Result};
use crate::query::{BaseQuery, FetchOptions, FetchRequest};

/// Counters for prefetch batches.
#[derive(Debug, Default)]
pub struct PrefetchStats {
    batches: AtomicU64,
    keys_requested: AtomicU64,
    keys_resolved: AtomicU64,
}

impl PrefetchStats {
    /// Batch lookups issued, one per prefetched field per fetch.
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Distinct keys requested across all batches.
    pub fn keys_requested(&self) -> u64 {
        self.keys_requested.load(Ordering::Relaxed)
    }

    /// Keys that resolved to an entity.
    pub fn keys_resolved(&self) -> u64 {
        self.keys_resolved.load(Ordering::Relaxed)
    }
}

/// Wraps a query and resolves the references of every fetched batch with
/// one lookup per prefetched field, instead of one lookup per record.
///
/// Implements [`BaseQuery`] itself, so it can sit under a
/// [`PagedQuery`](crate::paging::PagedQuery).
pub struct PrefetchingQuery<Q, R> {
    query: Q,
    resolver: R,
    properties: Option<Vec<PrefetchField>>,
    stats: PrefetchStats,
}

impl<Q, R> PrefetchingQuery<Q, R>
where
    Q: BaseQuery,
    Q::Record: ReferenceRecord,
    R: ReferenceResolver<Target = <Q::Record as ReferenceRecord>::Target>,
{
    /// Wrap `query`, resolving references through `resolver`.
    ///
    /// A chainable query over a kind with a known schema starts with the
    /// schema's list, parent included. Other queries derive theirs from the
    /// first fetched batch.
    pub fn new(query: Q, resolver: R) -> Self {
        let properties = if query.supports_mutation() {
            resolver
                .schema(query.shape().kind())
                .map(|schema| default_prefetch_fields(Some(&schema), true))
                .filter(|fields| !fields.is_empty())
        } else {
            None
        };
        Self {
            query,
            resolver,
            properties,
            stats: PrefetchStats::default(),
        }
    }

    /// Set the fields to prefetch, builder style.
    pub fn with_properties<I, F>(mut self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<PrefetchField>,
    {
        self.set_properties_to_prefetch(fields)?;
        Ok(self)
    }

    /// Fields to prefetch. `None` until set explicitly, taken from the
    /// schema, or derived from the first fetched batch.
    pub fn properties_to_prefetch(&self) -> Option<&[PrefetchField]> {
        self.properties.as_deref()
    }

    /// Set the fields to prefetch. The list must not be empty.
    pub fn set_properties_to_prefetch<I, F>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = F>,
        F: Into<PrefetchField>,
    {
        let mut list: Vec<PrefetchField> = Vec::new();
        for field in fields {
            let field = field.into();
            if !list.contains(&field) {
                list.push(field);
            }
        }
        if list.is_empty() {
            return Err(Error::InvalidArgument(
                "prefetch list must name at least one field".into(),
            ));
        }
        self.properties = Some(list);
        Ok(())
    }

    /// Add a filter from a `"<field> <op>"` expression.
    pub fn filter(&mut self, expr: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.query.filter(Filter::parse(expr, value)?)?;
        Ok(self)
    }

    /// Add an order clause, `"field"` or `"-field"`.
    pub fn order(&mut self, expr: &str) -> Result<&mut Self> {
        self.query.order(OrderSpec::parse(expr)?)?;
        Ok(self)
    }

    /// Restrict results to descendants of `key`.
    pub fn ancestor(&mut self, key: Key) -> Result<&mut Self> {
        self.query.ancestor(key)?;
        Ok(self)
    }

    /// Fetch records with their references resolved.
    pub fn fetch(&mut self, options: FetchOptions) -> Result<Vec<Q::Record>> {
        let request = options.into_request()?;
        BaseQuery::fetch(self, &request)
    }

    /// Count records on the wrapped query.
    pub fn count(&self, limit: Option<usize>) -> Result<usize> {
        self.query.count(limit)
    }

    /// Batch counters.
    pub fn stats(&self) -> &PrefetchStats {
        &self.stats
    }

    /// The wrapped query.
    pub fn query(&self) -> &Q {
        &self.query
    }

    #[instrument(skip_all, fields(records = records.len()))]
    fn prefetch(&mut self, records: &mut [Q::Record]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let fields = match &self.properties {
            Some(fields) => fields.clone(),
            None => {
                let schema = self.resolver.schema(first.kind());
                let derived = default_prefetch_fields(schema.as_ref(), first.has_parent());
                if !derived.is_empty() {
                    debug!(fields = ?derived, "derived prefetch list");
                    self.properties = Some(derived.clone());
                }
                derived
            }
        };

        for field in &fields {
            let mut seen = HashSet::new();
            let keys: Vec<Key> = records
                .iter()
                .filter_map(|record| record.reference(field))
                .filter(|key| seen.insert(key.clone()))
                .collect();
            if keys.is_empty() {
                continue;
            }

            let targets = self.resolver.resolve_many(&keys)?;
            self.stats.batches.fetch_add(1, Ordering::Relaxed);
            self.stats
                .keys_requested
                .fetch_add(keys.len() as u64, Ordering::Relaxed);

            let resolved: HashMap<Key, R::Target> = keys
                .into_iter()
                .zip(targets)
                .filter_map(|(key, target)| target.map(|t| (key, t)))
                .collect();
            self.stats
                .keys_resolved
                .fetch_add(resolved.len() as u64, Ordering::Relaxed);

            // Dangling references stay unresolved.
            for record in records.iter_mut() {
                if let Some(target) = record.reference(field).and_then(|k| resolved.get(&k)) {
                    record.attach(field, target.clone());
                }
            }
            debug!(%field, resolved = resolved.len(), "prefetched references");
        }
        Ok(())
    }
}

impl<Q, R> BaseQuery for PrefetchingQuery<Q, R>
where
    Q: BaseQuery,
    Q::Record: ReferenceRecord,
    R: ReferenceResolver<Target = <Q::Record as ReferenceRecord>::Target>,
{
    type Record = Q::Record;

    fn shape(&self) -> QueryShape {
        self.query.shape()
    }

    fn supports_mutation(&self) -> bool {
        self.query.supports_mutation()
    }

    fn filter(&mut self, filter: Filter) -> Result<()> {
        self.query.filter(filter)
    }

    fn order(&mut self, order: OrderSpec) -> Result<()> {
        self.query.order(order)
    }

    fn ancestor(&mut self, ancestor: Key) -> Result<()> {
        self.query.ancestor(ancestor)
    }

    fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<Self::Record>> {
        let mut records = self.query.fetch(request)?;
        self.prefetch(&mut records)?;
        Ok(records)
    }

    fn count(&self, limit: Option<usize>) -> Result<usize> {
        self.query.count(limit)
    }

    fn cursor(&self) -> Option<Cursor> {
        self.query.cursor()
    }
}
