//! Sliding-window rate limiter keyed by client IP and message type.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::debug;

use palisade_messages::{IncomingMessage, MessageType, OutgoingMessage};

use crate::{ClientContext, MessageGuard, MessageOutcome, Next};

/// Rejection message sent to rate-limited clients.
const RATE_LIMIT_MESSAGE: &str = "rate-limited: slow down there chief";

/// How often expired counters are pruned.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Per-message-type throttling parameters.
#[derive(Clone, Copy, Debug)]
pub struct ThrottlerConfig {
    /// Window length over which hits are counted.
    pub ttl: Duration,
    /// Maximum hits per window before the key is blocked.
    pub limit: u32,
    /// How long a blocked key stays blocked.
    pub block_duration: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    total_hits: u32,
    expires_at: Instant,
    blocked_until: Option<Instant>,
}

/// Message guard limiting how fast one client may send each message type.
///
/// Message types without a config entry pass through untouched. Blocked
/// EVENT messages are answered with `["OK", id, false, …]`, blocked REQ
/// messages with `["CLOSED", sub_id, …]`.
pub struct Throttler {
    config: HashMap<MessageType, ThrottlerConfig>,
    storage: Arc<Mutex<HashMap<String, Entry>>>,
    pruner: Mutex<Option<JoinHandle<()>>>,
}

impl Throttler {
    pub fn new(config: HashMap<MessageType, ThrottlerConfig>) -> Self {
        Self {
            config,
            storage: Arc::new(Mutex::new(HashMap::new())),
            pruner: Mutex::new(None),
        }
    }

    /// Spawn the periodic task that drops expired counters. Without it the
    /// storage map still behaves correctly but grows with unique clients.
    pub fn start_pruning(&self) {
        let storage = Arc::clone(&self.storage);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = Instant::now();
                storage.lock().expect("throttler lock poisoned").retain(|_, entry| {
                    if entry.blocked_until.is_some_and(|until| until > now) {
                        return true;
                    }
                    entry.expires_at >= now
                });
            }
        });
        *self.pruner.lock().expect("throttler lock poisoned") = Some(handle);
    }

    /// Stop the pruning task.
    pub fn destroy(&self) {
        if let Some(handle) = self.pruner.lock().expect("throttler lock poisoned").take() {
            handle.abort();
        }
    }

    /// Record a hit for `key` and report whether the key is blocked.
    fn increase(&self, key: &str, config: &ThrottlerConfig) -> bool {
        let now = Instant::now();
        let mut storage = self.storage.lock().expect("throttler lock poisoned");
        let entry = storage.entry(key.to_owned()).or_insert(Entry {
            total_hits: 0,
            expires_at: now + config.ttl,
            blocked_until: None,
        });

        if let Some(blocked_until) = entry.blocked_until {
            if now <= blocked_until {
                return true;
            }
            // Block expired; start a fresh window counting this hit.
            entry.blocked_until = None;
            entry.total_hits = 1;
            entry.expires_at = now + config.ttl;
            return false;
        }

        if entry.expires_at < now {
            entry.total_hits = 1;
            entry.expires_at = now + config.ttl;
            return false;
        }

        entry.total_hits += 1;
        if entry.total_hits > config.limit {
            entry.blocked_until = Some(now + config.block_duration);
            return true;
        }
        false
    }
}

impl Drop for Throttler {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl MessageGuard for Throttler {
    fn handle_message<'a>(
        &'a self,
        ctx: &'a ClientContext,
        message: &'a IncomingMessage,
        next: Next<'a>,
    ) -> BoxFuture<'a, MessageOutcome> {
        Box::pin(async move {
            let message_type = message.message_type();
            let Some(config) = self.config.get(&message_type) else {
                return next.await;
            };

            let key = format!("{}:{}", ctx.ip, message_type);
            if !self.increase(&key, config) {
                return next.await;
            }

            debug!(ip = %ctx.ip, %message_type, "rate limited");
            match message {
                IncomingMessage::Event(event) => {
                    ctx.send_message(OutgoingMessage::ok(
                        event.id.clone(),
                        false,
                        RATE_LIMIT_MESSAGE,
                    ));
                    MessageOutcome::failure(message_type, RATE_LIMIT_MESSAGE)
                }
                IncomingMessage::Req {
                    subscription_id, ..
                } => {
                    ctx.send_message(OutgoingMessage::closed(
                        subscription_id.clone(),
                        RATE_LIMIT_MESSAGE,
                    ));
                    MessageOutcome::failure(message_type, RATE_LIMIT_MESSAGE)
                }
                _ => MessageOutcome {
                    message_type,
                    success: false,
                    message: None,
                },
            }
        })
    }
}
