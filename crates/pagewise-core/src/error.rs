//! Core error types.

use thiserror::Error;

/// Errors reported by paged and prefetching queries.
///
/// Every variant is reported synchronously to the caller of the operation
/// that raised it. Nothing here is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input to a public operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not available on this query variant, e.g. adding a
    /// filter to a fixed query.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Failure reported by the query backend or reference resolver.
    #[error("backend error: {0}")]
    Backend(String),

    /// Cursor store error.
    #[error("cursor store error: {0}")]
    Store(#[from] sled::Error),

    /// Protocol encoding error.
    #[error("protocol error: {0}")]
    Protocol(pagewise_proto::Error),
}

impl From<pagewise_proto::Error> for Error {
    fn from(err: pagewise_proto::Error) -> Self {
        match err {
            // A bad expression is bad caller input, not an encoding failure.
            pagewise_proto::Error::InvalidExpression(msg) => Error::InvalidArgument(msg),
            other => Error::Protocol(other),
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
