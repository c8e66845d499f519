//! Storage error type.

use thiserror::Error;

/// Errors raised by event storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
