//! Protocol error types.

use thiserror::Error;

/// Errors raised while building or decoding protocol values.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter, order or key expression could not be parsed.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
