//! Web-of-trust admission guard.
//!
//! Admits an event only if its author is within a bounded "follow" distance
//! of a configured trust anchor pubkey. The distance is computed by a
//! breadth-first traversal over contact-list events, merged from the relay's
//! local store and a pool of remote relays, and published as an immutable
//! trust set that the hot-path admission check reads without blocking.

pub mod config;
pub mod engine;
pub mod error;
pub mod guard;

pub use config::WotConfig;
pub use engine::{WotEngine, WotOptions, REJECT_MESSAGE};
pub use error::WotError;
pub use guard::WotGuard;
