//! In-process WebSocket relay for exercising the client against real I/O.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use palisade_messages::{IncomingMessage, OutgoingMessage};
use palisade_types::{Event, EventId, Pubkey};

/// Scripted behavior of a [`MockRelay`].
#[derive(Clone, Default)]
pub struct MockBehavior {
    /// Events served to any `REQ` whose filter matches them.
    pub events: Vec<Event>,
    /// Raw frames sent verbatim before the events; `{sub}` is replaced with
    /// the requesting subscription id.
    pub raw_frames: Vec<String>,
    /// Whether to terminate each response with `EOSE`.
    pub send_eose: bool,
    /// Delay before answering a `REQ`.
    pub response_delay: Duration,
}

impl MockBehavior {
    pub fn serving(events: Vec<Event>) -> Self {
        Self {
            events,
            send_eose: true,
            ..Self::default()
        }
    }
}

pub struct MockRelay {
    pub url: String,
    accept_task: JoinHandle<()>,
}

impl MockRelay {
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
                        for raw in &behavior.raw_frames {
                            let _ = socket
                                .send(Message::Text(raw.replace("{sub}", &subscription_id)))
                                .await;
                        }
                        for event in &behavior.events {
                            if filters.iter().any(|filter| filter.matches(event)) {
                                let frame = OutgoingMessage::Event {
                                    subscription_id: subscription_id.clone(),
                                    event: event.clone(),
                                };
                                let _ = socket.send(Message::Text(frame.to_json())).await;
                            }
                        }
                        if behavior.send_eose {
                            let frame = OutgoingMessage::Eose {
                                subscription_id: subscription_id.clone(),
                            };
                            let _ = socket.send(Message::Text(frame.to_json())).await;
                        }
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
        id: EventId::parse(&hex_id(id_seed)).unwrap(),
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

/// A deterministic 64-char hex string.
pub fn hex_id(seed: u8) -> String {
    hex::encode([seed; 32])
}

pub fn pubkey(seed: u8) -> Pubkey {
    Pubkey::parse(&hex_id(seed)).unwrap()
}
