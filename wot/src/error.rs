//! Error type for the web-of-trust guard.

use thiserror::Error;

use palisade_store::StoreError;

/// Errors raised by the web-of-trust engine.
///
/// Per-relay connect failures and query timeouts are not errors: they
/// degrade a refresh to whatever the remaining sources report.
#[derive(Debug, Error)]
pub enum WotError {
    #[error("a trust anchor pubkey is required to enable the web-of-trust guard")]
    MissingTrustAnchor,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("local store query failed: {0}")]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Task(String),
}
