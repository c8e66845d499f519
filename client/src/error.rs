//! Client error type.

use thiserror::Error;

/// Errors raised while establishing relay connections.
///
/// Query failures are deliberately not represented here: an absent or
/// unresponsive relay contributes an empty result instead of an error, so
/// that one bad peer never blocks a traversal.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },
}
