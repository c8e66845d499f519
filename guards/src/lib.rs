//! Admission guard plugin seams for the relay message pipeline.
//!
//! Two hook points are supported:
//!
//! - [`EventGuard`] runs before an event is committed to the store and
//!   returns an [`EventDecision`].
//! - [`MessageGuard`] wraps the handling of a whole inbound message: the
//!   guard either awaits the `next` continuation (message allowed) or
//!   short-circuits, typically after sending a peer-visible rejection
//!   through the [`ClientContext`].
//!
//! The simple guards live here too: creation-time window, proof-of-work on
//! the event id and on the author pubkey, an OR-combinator, and a sliding
//! window rate limiter.

pub mod context;
pub mod created_at_limit;
pub mod or;
pub mod pow;
pub mod pubkey_pow;
pub mod throttler;

pub use context::ClientContext;
pub use created_at_limit::CreatedAtLimitGuard;
pub use or::OrGuard;
pub use pow::PowGuard;
pub use pubkey_pow::PubkeyPowGuard;
pub use throttler::{Throttler, ThrottlerConfig};

use futures_util::future::BoxFuture;

use palisade_messages::{IncomingMessage, MessageType};
use palisade_types::Event;

/// Outcome of an [`EventGuard`] check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventDecision {
    /// The event may be handled.
    Allow,
    /// The event is rejected, optionally with a peer-visible message.
    Deny { message: Option<String> },
}

impl EventDecision {
    /// A denial carrying a peer-visible message.
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny {
            message: Some(message.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// A guard consulted before an event is accepted.
pub trait EventGuard: Send + Sync {
    fn before_handle_event(&self, event: &Event) -> EventDecision;
}

/// Structured result of handling one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageOutcome {
    pub message_type: MessageType,
    pub success: bool,
    pub message: Option<String>,
}

impl MessageOutcome {
    pub fn success(message_type: MessageType) -> Self {
        Self {
            message_type,
            success: true,
            message: None,
        }
    }

    pub fn failure(message_type: MessageType, message: impl Into<String>) -> Self {
        Self {
            message_type,
            success: false,
            message: Some(message.into()),
        }
    }
}

/// The continuation passed to a [`MessageGuard`]: the rest of the pipeline.
pub type Next<'a> = BoxFuture<'a, MessageOutcome>;

/// A guard wrapping the handling of a whole inbound message.
pub trait MessageGuard: Send + Sync {
    fn handle_message<'a>(
        &'a self,
        ctx: &'a ClientContext,
        message: &'a IncomingMessage,
        next: Next<'a>,
    ) -> BoxFuture<'a, MessageOutcome>;
}
