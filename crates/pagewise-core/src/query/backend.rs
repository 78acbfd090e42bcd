//! The capability set a paging layer needs from a query backend.

use pagewise_proto::{Cursor, Filter, Key, OrderSpec, QueryShape};

use crate::error::{Error, Result};

/// One backend fetch: up to `limit` records, skipping `offset` records after
/// the start position, where the start position is `start` or the beginning
/// of the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Maximum number of records returned.
    pub limit: usize,
    /// Records skipped before the first returned one.
    pub offset: usize,
    /// Position to start from; `None` is the start of the result set.
    pub start: Option<Cursor>,
}

impl FetchRequest {
    /// Fetch up to `limit` records from the start of the result set.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            offset: 0,
            start: None,
        }
    }

    /// Skip `offset` records first.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Start from a cursor instead of the start of the result set.
    pub fn starting_at(mut self, cursor: Option<Cursor>) -> Self {
        self.start = cursor;
        self
    }
}

/// Arguments of a raw pass-through fetch. The limit is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    limit: Option<usize>,
    offset: usize,
}

impl FetchOptions {
    /// Fetch up to `limit` records.
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }

    /// Skip `offset` records first.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Validate into a backend request.
    pub fn into_request(self) -> Result<FetchRequest> {
        let limit = self
            .limit
            .ok_or_else(|| Error::InvalidArgument("fetch requires a limit".into()))?;
        Ok(FetchRequest::new(limit).with_offset(self.offset))
    }
}

/// A cursor-capable, ordered query.
///
/// Two variants implement this: chainable queries, which accept
/// `filter`/`order`/`ancestor`, and fixed queries, which were fully
/// parameterised when built and report `supports_mutation() == false`.
/// Fixed queries reject the three mutators with
/// [`Error::UnsupportedOperation`].
pub trait BaseQuery {
    /// Record type returned by fetches.
    type Record;

    /// The configuration that determines the result set.
    fn shape(&self) -> QueryShape;

    /// Whether `filter`, `order` and `ancestor` are available.
    fn supports_mutation(&self) -> bool;

    /// Restrict the result set.
    fn filter(&mut self, filter: Filter) -> Result<()>;

    /// Append an order clause.
    fn order(&mut self, order: OrderSpec) -> Result<()>;

    /// Restrict the result set to descendants of `ancestor`.
    fn ancestor(&mut self, ancestor: Key) -> Result<()>;

    /// Fetch records.
    fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<Self::Record>>;

    /// Count records, stopping at `limit` if given.
    fn count(&self, limit: Option<usize>) -> Result<usize>;

    /// Cursor positioned after the last record of the most recent fetch.
    fn cursor(&self) -> Option<Cursor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_options_require_limit() {
        let err = FetchOptions::default().into_request().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let request = FetchOptions::limit(10).offset(3).into_request().unwrap();
        assert_eq!(request, FetchRequest::new(10).with_offset(3));
    }

    #[test]
    fn test_request_builder() {
        let cursor = Cursor::from_bytes(vec![1, 2]);
        let request = FetchRequest::new(2).starting_at(Some(cursor.clone()));
        assert_eq!(request.start, Some(cursor));
        assert_eq!(request.offset, 0);
    }
}
