//! Error type for the core data model.

use thiserror::Error;

/// Errors raised when validating or constructing core types.
#[derive(Debug, Clone, Error)]
pub enum TypesError {
    #[error("invalid hex identifier: {0:?}")]
    InvalidHexId(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),
}
