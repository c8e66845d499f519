//! Creation-time window guard.

use std::time::{SystemTime, UNIX_EPOCH};

use palisade_types::Event;

use crate::{EventDecision, EventGuard};

/// Rejects events whose `created_at` lies too far from the current time.
/// Both bounds are optional and expressed in seconds.
#[derive(Clone, Debug, Default)]
pub struct CreatedAtLimitGuard {
    /// Maximum allowed seconds into the future.
    pub upper_limit: Option<u64>,
    /// Maximum allowed seconds into the past.
    pub lower_limit: Option<u64>,
}

impl CreatedAtLimitGuard {
    pub fn new(upper_limit: Option<u64>, lower_limit: Option<u64>) -> Self {
        Self {
            upper_limit,
            lower_limit,
        }
    }

    fn check(&self, created_at: u64, now: u64) -> EventDecision {
        if let Some(upper) = self.upper_limit {
            if created_at.saturating_sub(now) > upper {
                return EventDecision::deny(format!(
                    "invalid: created_at must not be later than {upper} seconds from the current time"
                ));
            }
        }
        if let Some(lower) = self.lower_limit {
            if now.saturating_sub(created_at) > lower {
                return EventDecision::deny(format!(
                    "invalid: created_at must not be earlier than {lower} seconds from the current time"
                ));
            }
        }
        EventDecision::Allow
    }
}

impl EventGuard for CreatedAtLimitGuard {
    fn before_handle_event(&self, event: &Event) -> EventDecision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.check(event.created_at, now)
    }
}
