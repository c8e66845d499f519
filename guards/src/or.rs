//! OR-combinator over event guards.

use palisade_types::Event;

use crate::{EventDecision, EventGuard};

/// Allows an event if any of its sub-guards allows it, checking them in
/// order and short-circuiting on the first allow. When every sub-guard
/// denies, the last denial is returned; an empty combinator denies with no
/// message.
#[derive(Default)]
pub struct OrGuard {
    guards: Vec<Box<dyn EventGuard>>,
}

impl OrGuard {
    pub fn new(guards: Vec<Box<dyn EventGuard>>) -> Self {
        Self { guards }
    }

    pub fn add_guard(&mut self, guard: Box<dyn EventGuard>) {
        self.guards.push(guard);
    }
}

impl EventGuard for OrGuard {
    fn before_handle_event(&self, event: &Event) -> EventDecision {
        let mut decision = EventDecision::Deny { message: None };
        for guard in &self.guards {
            decision = guard.before_handle_event(event);
            if decision.is_allowed() {
                return decision;
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::{EventId, Pubkey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGuard {
        decision: EventDecision,
        calls: AtomicUsize,
    }

    impl FixedGuard {
        fn new(decision: EventDecision) -> Self {
            Self {
                decision,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EventGuard for FixedGuard {
        fn before_handle_event(&self, _event: &Event) -> EventDecision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.decision.clone()
        }
    }

    impl EventGuard for std::sync::Arc<FixedGuard> {
        fn before_handle_event(&self, event: &Event) -> EventDecision {
            self.as_ref().before_handle_event(event)
        }
    }

    fn sample_event() -> Event {
        Event {
            id: EventId::parse(&"1".repeat(64)).unwrap(),
            pubkey: Pubkey::parse(&"2".repeat(64)).unwrap(),
            created_at: 0,
            kind: 1,
            tags: vec![],
            content: String::new(),
            sig: String::new(),
        }
    }

    #[test]
    fn empty_combinator_denies() {
        let guard = OrGuard::default();
        assert_eq!(
            guard.before_handle_event(&sample_event()),
            EventDecision::Deny { message: None }
        );
    }

    #[test]
    fn first_allow_wins() {
        let guard = OrGuard::new(vec![
            Box::new(FixedGuard::new(EventDecision::deny("first"))),
            Box::new(FixedGuard::new(EventDecision::Allow)),
            Box::new(FixedGuard::new(EventDecision::deny("third"))),
        ]);
        assert!(guard.before_handle_event(&sample_event()).is_allowed());
    }

    #[test]
    fn short_circuits_after_an_allow() {
        let second = std::sync::Arc::new(FixedGuard::new(EventDecision::deny("never checked")));

        let mut guard = OrGuard::default();
        guard.add_guard(Box::new(FixedGuard::new(EventDecision::Allow)));
        guard.add_guard(Box::new(second.clone()));

        guard.before_handle_event(&sample_event());
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn all_denials_returns_the_last() {
        let guard = OrGuard::new(vec![
            Box::new(FixedGuard::new(EventDecision::deny("first"))),
            Box::new(FixedGuard::new(EventDecision::deny("last"))),
        ]);
        assert_eq!(
            guard.before_handle_event(&sample_event()),
            EventDecision::deny("last")
        );
    }
}
