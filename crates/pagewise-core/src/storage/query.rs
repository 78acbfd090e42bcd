//! Cursor-capable queries over a [`MemoryStore`].

use std::cmp::Ordering;

use rkyv::{Archive, Deserialize, Serialize};
use pagewise_proto::{Cursor, Filter, Key, OrderDirection, OrderSpec, QueryShape, QuerySpec, Value};
use tracing::trace;

use super::entity::Entity;
use super::gql;
use super::store::MemoryStore;
use crate::error::{Error, Result};
use crate::query::{BaseQuery, FetchRequest};

/// Position encoded in a cursor: the sort values and key of the last record
/// consumed.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
struct Position {
    values: Vec<Value>,
    key: Key,
}

impl Position {
    fn encode(&self) -> Result<Cursor> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|bytes| Cursor::from_bytes(bytes.to_vec()))
            .map_err(|e| Error::Backend(format!("cursor encoding failed: {e}")))
    }

    fn decode(cursor: &Cursor, order_len: usize) -> Result<Self> {
        let mut aligned: rkyv::util::AlignedVec<16> = rkyv::util::AlignedVec::new();
        aligned.extend_from_slice(cursor.as_bytes());
        let position = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::InvalidArgument(format!("malformed cursor: {e}")))?;
        if position.values.len() != order_len {
            return Err(Error::InvalidArgument(
                "cursor was issued for a different ordering".into(),
            ));
        }
        Ok(position)
    }
}

/// The literal form of a fixed query.
#[derive(Debug, Clone)]
struct FixedText {
    text: String,
    params: Vec<(String, Value)>,
}

/// A query over one entity kind in a [`MemoryStore`].
///
/// Results are ordered by the order clauses, ties broken by key, so every
/// position in the result set is unique and cursors resume exactly after
/// the last record consumed.
#[derive(Clone)]
pub struct MemoryQuery {
    store: MemoryStore,
    spec: QuerySpec,
    fixed: Option<FixedText>,
    cursor: Option<Cursor>,
}

impl MemoryQuery {
    pub(crate) fn new(store: MemoryStore, spec: QuerySpec) -> Self {
        Self {
            store,
            spec,
            fixed: None,
            cursor: None,
        }
    }

    pub(crate) fn fixed(
        store: MemoryStore,
        kind: String,
        text: String,
        params: Vec<(String, Value)>,
    ) -> Result<Self> {
        let spec = gql::parse(&kind, &text, &params)?;
        Ok(Self {
            store,
            spec,
            fixed: Some(FixedText { text, params }),
            cursor: None,
        })
    }

    /// The effective query configuration.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Whether this query was built from fixed text.
    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    fn ensure_mutable(&self, operation: &str) -> Result<()> {
        if self.fixed.is_some() {
            return Err(Error::UnsupportedOperation(format!(
                "{operation} is not available on a fixed query"
            )));
        }
        Ok(())
    }

    fn sort_values(&self, fields: &[(String, Value)]) -> Vec<Value> {
        self.spec
            .order_by
            .iter()
            .map(|order| {
                fields
                    .iter()
                    .find(|(n, _)| *n == order.field)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

fn compare_positions(
    order: &[OrderSpec],
    a: (&[Value], &Key),
    b: (&[Value], &Key),
) -> Ordering {
    for ((spec, x), y) in order.iter().zip(a.0).zip(b.0) {
        let ord = match spec.direction {
            OrderDirection::Asc => x.sort_cmp(y),
            OrderDirection::Desc => y.sort_cmp(x),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.1.cmp(b.1)
}

impl BaseQuery for MemoryQuery {
    type Record = Entity;

    fn shape(&self) -> QueryShape {
        match &self.fixed {
            Some(fixed) => QueryShape::Fixed {
                kind: self.spec.kind.clone(),
                text: fixed.text.clone(),
                params: fixed.params.clone(),
            },
            None => QueryShape::Chainable(self.spec.clone()),
        }
    }

    fn supports_mutation(&self) -> bool {
        self.fixed.is_none()
    }

    fn filter(&mut self, filter: Filter) -> Result<()> {
        self.ensure_mutable("filter")?;
        self.spec.filters.push(filter);
        self.cursor = None;
        Ok(())
    }

    fn order(&mut self, order: OrderSpec) -> Result<()> {
        self.ensure_mutable("order")?;
        self.spec.order_by.push(order);
        self.cursor = None;
        Ok(())
    }

    fn ancestor(&mut self, ancestor: Key) -> Result<()> {
        self.ensure_mutable("ancestor")?;
        self.spec.ancestor = Some(ancestor);
        self.cursor = None;
        Ok(())
    }

    fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<Entity>> {
        let order = &self.spec.order_by;
        let mut rows: Vec<(Vec<Value>, Key, Vec<(String, Value)>)> = self
            .store
            .scan(&self.spec)
            .into_iter()
            .map(|(key, fields)| (self.sort_values(&fields), key, fields))
            .collect();
        rows.sort_by(|a, b| compare_positions(order, (&a.0, &a.1), (&b.0, &b.1)));

        let begin = match &request.start {
            Some(cursor) => {
                let after = Position::decode(cursor, order.len())?;
                rows.partition_point(|row| {
                    compare_positions(order, (&row.0, &row.1), (&after.values, &after.key))
                        != Ordering::Greater
                })
            }
            None => 0,
        };
        let from = begin.saturating_add(request.offset).min(rows.len());
        let end = from.saturating_add(request.limit).min(rows.len());

        // The cursor sits after the last record consumed, skipped or returned.
        self.cursor = if end > begin {
            let (values, key, _) = &rows[end - 1];
            Some(
                Position {
                    values: values.clone(),
                    key: key.clone(),
                }
                .encode()?,
            )
        } else {
            request.start.clone()
        };

        let records: Vec<Entity> = rows
            .drain(from..end)
            .map(|(_, key, fields)| Entity::from_parts(key, fields))
            .collect();
        self.store
            .count_instantiations(&self.spec.kind, records.len() as u64);

        trace!(
            kind = %self.spec.kind,
            offset = request.offset,
            limit = request.limit,
            resumed = request.start.is_some(),
            returned = records.len(),
            "memory fetch"
        );
        Ok(records)
    }

    fn count(&self, limit: Option<usize>) -> Result<usize> {
        let n = self.store.scan(&self.spec).len();
        Ok(limit.map_or(n, |limit| n.min(limit)))
    }

    fn cursor(&self) -> Option<Cursor> {
        self.cursor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (name, score) in [("a", 3), ("b", 1), ("c", 2), ("d", 2), ("e", 5)] {
            store.put(&Entity::new(Key::new("Item", name)).with("score", score));
        }
        store
    }

    fn names(records: &[Entity]) -> Vec<&str> {
        records.iter().map(|e| e.key().name()).collect()
    }

    #[test]
    fn test_order_with_key_tiebreak() {
        let mut query = store().query("Item");
        query.order(OrderSpec::asc("score")).unwrap();
        let records = query.fetch(&FetchRequest::new(10)).unwrap();
        assert_eq!(names(&records), vec!["b", "c", "d", "a", "e"]);

        let mut query = store().query("Item");
        query.order(OrderSpec::desc("score")).unwrap();
        let records = query.fetch(&FetchRequest::new(10)).unwrap();
        assert_eq!(names(&records), vec!["e", "a", "c", "d", "b"]);
    }

    #[test]
    fn test_cursor_resumes_after_last_record() {
        let mut query = store().query("Item");
        query.order(OrderSpec::asc("score")).unwrap();

        let first = query.fetch(&FetchRequest::new(2)).unwrap();
        assert_eq!(names(&first), vec!["b", "c"]);
        let cursor = query.cursor();
        assert!(cursor.is_some());

        let second = query.fetch(&FetchRequest::new(2).starting_at(cursor)).unwrap();
        assert_eq!(names(&second), vec!["d", "a"]);
    }

    #[test]
    fn test_offset_from_cursor() {
        let mut query = store().query("Item");
        query.order(OrderSpec::asc("score")).unwrap();
        query.fetch(&FetchRequest::new(1)).unwrap();
        let cursor = query.cursor();

        let records = query
            .fetch(&FetchRequest::new(2).with_offset(2).starting_at(cursor))
            .unwrap();
        assert_eq!(names(&records), vec!["a", "e"]);
    }

    #[test]
    fn test_fetch_past_end() {
        let mut query = store().query("Item");
        let records = query.fetch(&FetchRequest::new(2).with_offset(10)).unwrap();
        assert!(records.is_empty());

        query.fetch(&FetchRequest::new(1)).unwrap();
        let cursor = query.cursor();
        let records = query
            .fetch(&FetchRequest::new(usize::MAX).with_offset(usize::MAX).starting_at(cursor))
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_cursor_for_other_ordering_rejected() {
        let mut query = store().query("Item");
        query.order(OrderSpec::asc("score")).unwrap();
        query.fetch(&FetchRequest::new(1)).unwrap();
        let cursor = query.cursor();

        let mut other = store().query("Item");
        let err = other
            .fetch(&FetchRequest::new(1).starting_at(cursor))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_count_with_limit() {
        let mut query = store().query("Item");
        query.filter(Filter::gt("score", 1)).unwrap();
        assert_eq!(query.count(None).unwrap(), 4);
        assert_eq!(query.count(Some(2)).unwrap(), 2);
    }

    #[test]
    fn test_fixed_query_rejects_mutation() {
        let mut query = store()
            .gql("Item", "WHERE score > :min ORDER BY score", vec![("min".into(), Value::Int64(2))])
            .unwrap();
        assert!(!query.supports_mutation());
        assert!(matches!(
            query.filter(Filter::eq("score", 1)),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            query.order(OrderSpec::asc("score")),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            query.ancestor(Key::new("Item", "a")),
            Err(Error::UnsupportedOperation(_))
        ));

        let records = query.fetch(&FetchRequest::new(10)).unwrap();
        assert_eq!(names(&records), vec!["a", "e"]);
        assert!(matches!(query.shape(), QueryShape::Fixed { .. }));
    }

    #[test]
    fn test_fetch_counts_instantiations() {
        let store = store();
        let mut query = store.query("Item");
        query.fetch(&FetchRequest::new(3)).unwrap();
        assert_eq!(store.instantiations("Item"), 3);
    }
}
