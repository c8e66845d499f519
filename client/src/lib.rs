//! Outbound relay protocol client.
//!
//! Speaks the minimal subscription subset against remote relays: open a
//! WebSocket, send `["REQ", subscription_id, filter]`, collect `["EVENT",
//! subscription_id, event]` frames until `["EOSE", subscription_id]` or a
//! timeout. [`RelayConnection`] owns one connection; [`RelayPool`] fans the
//! same query out to many relays and deduplicates the results.

pub mod error;
pub mod pool;
pub mod relay;

pub use error::ClientError;
pub use pool::RelayPool;
pub use relay::{ConnectionState, RelayConnection};
