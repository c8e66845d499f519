//! Abstract event storage for the Palisade guard suite.
//!
//! The web-of-trust traversal consults the relay's local event store for
//! contact lists before reaching out to remote relays. Backends implement
//! [`EventStore`]; the rest of the workspace depends only on the trait.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryEventStore;

use palisade_types::{Event, Filter};

/// Read access to locally stored events.
pub trait EventStore: Send + Sync {
    /// All stored events matching `filter`.
    fn find(&self, filter: &Filter) -> Result<Vec<Event>, StoreError>;
}
