//! Query configuration types.
//!
//! A query's configuration is the part of it that decides which records are
//! in the result set and in what order: its filters, order clauses and
//! ancestor. Everything a paging layer caches is only valid for one
//! configuration, so these types are also what query identities are computed
//! from.

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;
use crate::key::Key;
use crate::value::Value;

/// Comparison operator of a filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum FilterOp {
    /// Field equals value.
    Eq,
    /// Field not equals value.
    Ne,
    /// Field less than value.
    Lt,
    /// Field less than or equal to value.
    Le,
    /// Field greater than value.
    Gt,
    /// Field greater than or equal to value.
    Ge,
}

impl FilterOp {
    /// Parse an operator token.
    pub fn parse(token: &str) -> Result<Self, Error> {
        match token {
            "=" | "==" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::Ne),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Le),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Ge),
            other => Err(Error::InvalidExpression(format!(
                "unknown filter operator '{other}'"
            ))),
        }
    }

    /// The operator's token.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        }
    }
}

/// A single `(field, operator, value)` filter.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Filter {
    /// Field the filter applies to.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Value compared against.
    pub value: Value,
}

impl Filter {
    /// Create a filter.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Parse a `"<field> <op>"` expression, e.g. `"birthdate >"`.
    ///
    /// A bare field name is rejected: the operator is mandatory.
    pub fn parse(expr: &str, value: impl Into<Value>) -> Result<Self, Error> {
        let mut parts = expr.split_whitespace();
        let field = parts
            .next()
            .ok_or_else(|| Error::InvalidExpression("empty filter expression".into()))?;
        let op = parts.next().ok_or_else(|| {
            Error::InvalidExpression(format!("filter '{expr}' is missing an operator"))
        })?;
        if parts.next().is_some() {
            return Err(Error::InvalidExpression(format!(
                "filter '{expr}' has trailing tokens"
            )));
        }
        Ok(Self::new(field, FilterOp::parse(op)?, value))
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    /// Evaluate the filter against a field value; a missing field never
    /// matches.
    pub fn matches(&self, field_value: Option<&Value>) -> bool {
        let Some(fv) = field_value else {
            return false;
        };
        match self.op {
            FilterOp::Eq => fv.loosely_equals(&self.value),
            FilterOp::Ne => !fv.loosely_equals(&self.value),
            FilterOp::Lt => fv.partial_compare(&self.value).is_some_and(|o| o.is_lt()),
            FilterOp::Le => fv.partial_compare(&self.value).is_some_and(|o| o.is_le()),
            FilterOp::Gt => fv.partial_compare(&self.value).is_some_and(|o| o.is_gt()),
            FilterOp::Ge => fv.partial_compare(&self.value).is_some_and(|o| o.is_ge()),
        }
    }
}

/// Sort direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// One order clause.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create ascending order.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create descending order.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parse `"field"` (ascending) or `"-field"` (descending).
    pub fn parse(expr: &str) -> Result<Self, Error> {
        let expr = expr.trim();
        let (field, direction) = match expr.strip_prefix('-') {
            Some(rest) => (rest, OrderDirection::Desc),
            None => (expr, OrderDirection::Asc),
        };
        if field.is_empty() || field.contains(char::is_whitespace) {
            return Err(Error::InvalidExpression(format!(
                "invalid order expression '{expr}'"
            )));
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderDirection::Asc => write!(f, "{}", self.field),
            OrderDirection::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// Configuration of a chainable query: entity kind, filters in the order
/// they were applied, order clauses, and an optional ancestor.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct QuerySpec {
    /// Entity kind queried.
    pub kind: String,
    /// Filters, in application order.
    pub filters: Vec<Filter>,
    /// Order clauses, most significant first.
    pub order_by: Vec<OrderSpec>,
    /// Ancestor restriction.
    pub ancestor: Option<Key>,
}

impl QuerySpec {
    /// Create an unfiltered, unordered query over a kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filters: vec![],
            order_by: vec![],
            ancestor: None,
        }
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an order clause.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the ancestor.
    pub fn with_ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }
}

/// Everything that determines a query's result set, for either query
/// variant.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum QueryShape {
    /// A chainable query described by its configuration.
    Chainable(QuerySpec),
    /// A fixed, pre-parameterised query described by its literal text and
    /// bound parameters.
    Fixed {
        /// Entity kind queried.
        kind: String,
        /// Query text as written.
        text: String,
        /// Bound parameters, in binding order.
        params: Vec<(String, Value)>,
    },
}

impl QueryShape {
    /// Entity kind queried.
    pub fn kind(&self) -> &str {
        match self {
            QueryShape::Chainable(spec) => &spec.kind,
            QueryShape::Fixed { kind, .. } => kind,
        }
    }

    /// Canonical byte encoding of the shape.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parse() {
        let filter = Filter::parse("birthdate >", Value::date(1981, 1, 1)).unwrap();
        assert_eq!(filter.field, "birthdate");
        assert_eq!(filter.op, FilterOp::Gt);

        assert!(Filter::parse("", 1).is_err());
        assert!(Filter::parse("name", 1).is_err());
        assert!(Filter::parse("name ~", 1).is_err());
        assert!(Filter::parse("name > extra", 1).is_err());
    }

    #[test]
    fn test_filter_matches() {
        let filter = Filter::gt("age", 30);
        assert!(filter.matches(Some(&Value::Int64(31))));
        assert!(!filter.matches(Some(&Value::Int32(30))));
        assert!(!filter.matches(Some(&Value::from("31"))));
        assert!(!filter.matches(None));

        let ne = Filter::parse("name !=", "bob").unwrap();
        assert!(ne.matches(Some(&Value::from("alice"))));
    }

    #[test]
    fn test_order_parse() {
        assert_eq!(OrderSpec::parse("name").unwrap(), OrderSpec::asc("name"));
        assert_eq!(OrderSpec::parse("-name").unwrap(), OrderSpec::desc("name"));
        assert_eq!(OrderSpec::parse("-name").unwrap().to_string(), "-name");
        assert!(OrderSpec::parse("").is_err());
        assert!(OrderSpec::parse("-").is_err());
        assert!(OrderSpec::parse("birthdate asc").is_err());
    }

    #[test]
    fn test_canonical_bytes_deterministic() {
        let shape = QueryShape::Chainable(
            QuerySpec::new("Person")
                .with_filter(Filter::eq("name", "Warwick"))
                .with_order(OrderSpec::asc("birthdate")),
        );
        assert_eq!(
            shape.canonical_bytes().unwrap(),
            shape.clone().canonical_bytes().unwrap()
        );
    }
}
