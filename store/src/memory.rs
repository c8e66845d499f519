//! In-memory event store.
//!
//! Thread-safe, unindexed. Used as a test double and for small deployments
//! that keep the whole event set resident.

use std::sync::RwLock;

use palisade_types::{Event, Filter};

use crate::{EventStore, StoreError};

/// A store holding all events in a vector behind a read-write lock.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one event.
    pub fn insert(&self, event: Event) {
        self.events.write().expect("store lock poisoned").push(event);
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventStore for MemoryEventStore {
    fn find(&self, filter: &Filter) -> Result<Vec<Event>, StoreError> {
        let events = self.events.read().expect("store lock poisoned");
        Ok(events
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect())
    }
}
