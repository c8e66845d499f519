//! Proof-of-work guard on the author pubkey.

use palisade_types::{pow_difficulty, Event};

use crate::{EventDecision, EventGuard};

/// Rejects events whose author pubkey has fewer leading zero bits than the
/// configured minimum. Mining a pubkey is a one-time cost per identity, so
/// this raises the price of throwaway keys without per-event work.
#[derive(Clone, Debug)]
pub struct PubkeyPowGuard {
    difficulty: u32,
}

impl PubkeyPowGuard {
    pub fn new(difficulty: u32) -> Self {
        Self { difficulty }
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }
}

impl EventGuard for PubkeyPowGuard {
    fn before_handle_event(&self, event: &Event) -> EventDecision {
        if self.difficulty == 0 {
            return EventDecision::Allow;
        }

        if pow_difficulty(event.pubkey.as_str()) < self.difficulty {
            EventDecision::deny("pubkey pow difficulty is too low")
        } else {
            EventDecision::Allow
        }
    }
}
