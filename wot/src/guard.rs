//! Guard adapter wiring the engine into the relay's plugin seams.

use futures_util::future::BoxFuture;

use palisade_guards::{ClientContext, EventDecision, EventGuard, MessageGuard, MessageOutcome, Next};
use palisade_messages::{IncomingMessage, MessageType, OutgoingMessage};
use palisade_types::Event;

use crate::engine::{WotEngine, REJECT_MESSAGE};

/// Adapter exposing the engine as both an [`EventGuard`] (pre-admission
/// hook) and a [`MessageGuard`] (message-handling hook). Which one the host
/// wires up is a configuration choice; both delegate to the same engine.
pub struct WotGuard {
    engine: WotEngine,
}

impl WotGuard {
    pub fn new(engine: WotEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &WotEngine {
        &self.engine
    }
}

impl EventGuard for WotGuard {
    fn before_handle_event(&self, event: &Event) -> EventDecision {
        self.engine.check_event(event)
    }
}

impl MessageGuard for WotGuard {
    fn handle_message<'a>(
        &'a self,
        ctx: &'a ClientContext,
        message: &'a IncomingMessage,
        next: Next<'a>,
    ) -> BoxFuture<'a, MessageOutcome> {
        Box::pin(async move {
            let IncomingMessage::Event(event) = message else {
                return next.await;
            };
            match self.engine.check_event(event) {
                EventDecision::Allow => next.await,
                EventDecision::Deny { message } => {
                    let reason = message.unwrap_or_else(|| REJECT_MESSAGE.to_owned());
                    ctx.send_message(OutgoingMessage::ok(
                        event.id.clone(),
                        false,
                        reason.clone(),
                    ));
                    MessageOutcome::failure(MessageType::Event, reason)
                }
            }
        })
    }
}
