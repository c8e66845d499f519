//! In-process WebSocket relay and fixtures for trust-graph tests.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use palisade_messages::{IncomingMessage, OutgoingMessage};
use palisade_types::{Event, EventId, Pubkey};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Scripted behavior of a [`MockRelay`].
#[derive(Clone, Default)]
pub struct MockBehavior {
    /// Events served to any `REQ` whose filter matches them.
    pub events: Vec<Event>,
    /// Delay before answering a `REQ`.
    pub response_delay: Duration,
}

pub struct MockRelay {
    pub url: String,
    accept_task: JoinHandle<()>,
}

impl MockRelay {
    pub async fn serving(events: Vec<Event>) -> Self {
        Self::spawn(MockBehavior {
            events,
            ..MockBehavior::default()
        })
        .await
    }

    pub async fn spawn(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));

        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let behavior = behavior.clone();
                tokio::spawn(async move {
                    let Ok(mut socket) = accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(frame)) = socket.next().await {
                        let Ok(text) = frame.to_text() else { continue };
                        let Ok(IncomingMessage::Req {
                            subscription_id,
                            filters,
                        }) = IncomingMessage::from_json(text)
                        else {
                            continue;
                        };

                        tokio::time::sleep(behavior.response_delay).await;
                        for event in &behavior.events {
                            if filters.iter().any(|filter| filter.matches(event)) {
                                let frame = OutgoingMessage::Event {
                                    subscription_id: subscription_id.clone(),
                                    event: event.clone(),
                                };
                                let _ = socket.send(Message::Text(frame.to_json())).await;
                            }
                        }
                        let frame = OutgoingMessage::Eose {
                            subscription_id: subscription_id.clone(),
                        };
                        let _ = socket.send(Message::Text(frame.to_json())).await;
                    }
                });
            }
        });

        Self { url, accept_task }
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// A contact-list event by `author` following `contacts`.
pub fn contact_list(id_seed: u8, author: &Pubkey, contacts: &[Pubkey], created_at: u64) -> Event {
    Event {
        id: EventId::parse(&hex::encode([id_seed; 32])).unwrap(),
        pubkey: author.clone(),
        created_at,
        kind: 3,
        tags: contacts
            .iter()
            .map(|pk| vec!["p".to_owned(), pk.as_str().to_owned()])
            .collect(),
        content: String::new(),
        sig: String::new(),
    }
}

pub fn pubkey(seed: u8) -> Pubkey {
    Pubkey::parse(&hex::encode([seed; 32])).unwrap()
}
