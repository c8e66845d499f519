//! A single outbound relay connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::RngCore;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use palisade_messages::{IncomingMessage, OutgoingMessage};
use palisade_types::{Event, Filter};

use crate::ClientError;

/// Timeout for establishing the WebSocket connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for one subscription query; on expiry whatever was collected so
/// far is returned.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a relay connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

type WsSink = futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// One connection to one remote relay.
///
/// A read task routes inbound `EVENT` frames to the query that issued the
/// matching subscription id; `EOSE` removes the correlation entry, which
/// ends the collecting query. Malformed frames and events failing structural
/// validation are dropped without surfacing an error.
pub struct RelayConnection {
    url: String,
    state: Mutex<ConnectionState>,
    write: tokio::sync::Mutex<Option<WsSink>>,
    pending: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Event>>>>,
    read_task: Option<JoinHandle<()>>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl RelayConnection {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeouts(url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeouts(
        url: impl Into<String>,
        connect_timeout: Duration,
        query_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            state: Mutex::new(ConnectionState::Disconnected),
            write: tokio::sync::Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            read_task: None,
            connect_timeout,
            query_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().expect("state lock poisoned")
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// Establish the connection. A no-op when already connected; on failure
    /// the connection is left disconnected.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }
        self.set_state(ConnectionState::Connecting);

        let connected =
            tokio::time::timeout(self.connect_timeout, connect_async(&self.url)).await;
        let (socket, _response) = match connected {
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(ClientError::ConnectTimeout(self.url.clone()));
            }
            Ok(Err(error)) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(ClientError::ConnectFailed {
                    url: self.url.clone(),
                    reason: error.to_string(),
                });
            }
            Ok(Ok(pair)) => pair,
        };

        let (write, mut read) = socket.split();
        *self.write.get_mut() = Some(write);

        let pending = Arc::clone(&self.pending);
        let url = self.url.clone();
        self.read_task = Some(tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let message = match frame {
                    Ok(message) => message,
                    Err(error) => {
                        debug!(%url, %error, "read failed, dropping connection");
                        break;
                    }
                };
                let Ok(text) = message.to_text() else {
                    continue;
                };
                match OutgoingMessage::from_json(text) {
                    Ok(OutgoingMessage::Event {
                        subscription_id,
                        event,
                    }) => {
                        let pending = pending.lock().expect("correlation lock poisoned");
                        if let Some(tx) = pending.get(&subscription_id) {
                            let _ = tx.send(event);
                        }
                    }
                    Ok(OutgoingMessage::Eose { subscription_id }) => {
                        pending
                            .lock()
                            .expect("correlation lock poisoned")
                            .remove(&subscription_id);
                    }
                    Ok(_) => {}
                    Err(error) => debug!(%url, %error, "dropping malformed frame"),
                }
            }
            // Connection gone; wake up any queries still collecting.
            pending
                .lock()
                .expect("correlation lock poisoned")
                .clear();
        }));

        self.set_state(ConnectionState::Connected);
        debug!(url = %self.url, "connected");
        Ok(())
    }

    /// Issue one subscription query and collect matching events until the
    /// relay signals end-of-stream or the query timeout elapses.
    ///
    /// Returns an empty vector immediately when not connected; an absent
    /// relay must not block the caller.
    pub async fn fetch_events(&self, filter: &Filter) -> Vec<Event> {
        if !self.is_connected() {
            return Vec::new();
        }

        let subscription_id = new_subscription_id();
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.pending
            .lock()
            .expect("correlation lock poisoned")
            .insert(subscription_id.clone(), tx);

        let frame = IncomingMessage::req(subscription_id.clone(), filter.clone()).to_json();
        let sent = {
            let mut write = self.write.lock().await;
            match write.as_mut() {
                Some(sink) => sink.send(Message::Text(frame)).await.is_ok(),
                None => false,
            }
        };
        if !sent {
            self.pending
                .lock()
                .expect("correlation lock poisoned")
                .remove(&subscription_id);
            return Vec::new();
        }

        let deadline = tokio::time::Instant::now() + self.query_timeout;
        let mut events = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(event)) => events.push(event),
                // EOSE (or teardown) dropped our sender.
                Ok(None) => break,
                Err(_) => {
                    self.pending
                        .lock()
                        .expect("correlation lock poisoned")
                        .remove(&subscription_id);
                    debug!(url = %self.url, collected = events.len(), "query timed out");
                    break;
                }
            }
        }
        events
    }

    /// Tear down the connection and discard all pending correlation entries.
    pub async fn close(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(mut sink) = self.write.get_mut().take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        self.pending
            .lock()
            .expect("correlation lock poisoned")
            .clear();
        self.set_state(ConnectionState::Closed);
    }
}

fn new_subscription_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
