//! Proof-of-work guard on the event id.

use palisade_types::{pow_difficulty, Event};

use crate::{EventDecision, EventGuard};

/// Rejects events whose id has fewer leading zero bits than the configured
/// minimum, honoring the committed target of a three-element nonce tag: an
/// event that meets the minimum but commits to a target below it is rejected
/// anyway, while an event without a commitment cannot be rejected on the
/// commitment alone.
#[derive(Clone, Debug)]
pub struct PowGuard {
    min_difficulty: u32,
}

impl PowGuard {
    pub fn new(min_difficulty: u32) -> Self {
        Self { min_difficulty }
    }

    pub fn set_min_difficulty(&mut self, min_difficulty: u32) {
        self.min_difficulty = min_difficulty;
    }

    pub fn min_difficulty(&self) -> u32 {
        self.min_difficulty
    }
}

impl EventGuard for PowGuard {
    fn before_handle_event(&self, event: &Event) -> EventDecision {
        if self.min_difficulty == 0 {
            return EventDecision::Allow;
        }

        let difficulty = pow_difficulty(event.id.as_str());
        if difficulty < self.min_difficulty {
            return EventDecision::deny(format!(
                "pow: difficulty {difficulty} is less than {}",
                self.min_difficulty
            ));
        }

        // Without a committed target the work cannot be distinguished from
        // luck, so the event passes on the measured difficulty alone.
        let Some(target) = event.nonce_target() else {
            return EventDecision::Allow;
        };
        match target.parse::<u32>() {
            Ok(target) if target >= self.min_difficulty => EventDecision::Allow,
            Ok(target) => EventDecision::deny(format!(
                "pow: difficulty {target} is less than {}",
                self.min_difficulty
            )),
            Err(_) => EventDecision::deny(format!(
                "pow: committed difficulty target {target:?} is not a number"
            )),
        }
    }
}
