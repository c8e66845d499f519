//! Fan-out over a set of relay connections.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, warn};

use palisade_types::{Event, Filter};

use crate::relay::{RelayConnection, DEFAULT_CONNECT_TIMEOUT, DEFAULT_QUERY_TIMEOUT};

/// A pool of relay connections sharing one configured relay list.
///
/// Every query is issued to every live connection concurrently; results are
/// merged and deduplicated by event id. A relay that fails to connect or
/// answer is excluded from that round, never an error: the pool degrades
/// down to an empty result.
pub struct RelayPool {
    urls: Vec<String>,
    relays: Vec<RelayConnection>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl RelayPool {
    pub fn new(urls: Vec<String>) -> Self {
        Self::with_timeouts(urls, DEFAULT_CONNECT_TIMEOUT, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeouts(
        urls: Vec<String>,
        connect_timeout: Duration,
        query_timeout: Duration,
    ) -> Self {
        Self {
            urls,
            relays: Vec::new(),
            connect_timeout,
            query_timeout,
        }
    }

    /// Connect to every configured relay concurrently, keeping only the
    /// successes. Returns the URLs that connected. Any connections from a
    /// previous round are torn down first.
    pub async fn connect_all(&mut self) -> Vec<String> {
        self.shutdown().await;

        let mut connections: Vec<RelayConnection> = self
            .urls
            .iter()
            .map(|url| {
                RelayConnection::with_timeouts(
                    url.clone(),
                    self.connect_timeout,
                    self.query_timeout,
                )
            })
            .collect();
        let results = join_all(connections.iter_mut().map(|conn| conn.connect())).await;

        for (connection, result) in connections.into_iter().zip(results) {
            match result {
                Ok(()) => self.relays.push(connection),
                Err(error) => warn!(%error, "relay excluded from pool"),
            }
        }

        let connected: Vec<String> = self
            .relays
            .iter()
            .map(|relay| relay.url().to_owned())
            .collect();
        info!(
            connected = connected.len(),
            configured = self.urls.len(),
            "relay pool ready"
        );
        connected
    }

    /// Number of currently connected relays.
    pub fn connected_count(&self) -> usize {
        self.relays.len()
    }

    /// Query every connected relay concurrently and merge the results,
    /// keeping the first occurrence of each event id. Each per-relay query
    /// is bounded by its own timeout, so this call is bounded too.
    pub async fn fetch_events(&self, filter: &Filter) -> Vec<Event> {
        let batches = join_all(self.relays.iter().map(|relay| relay.fetch_events(filter))).await;

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for event in batches.into_iter().flatten() {
            if seen.insert(event.id.clone()) {
                unique.push(event);
            }
        }
        unique
    }

    /// Close every owned connection.
    pub async fn shutdown(&mut self) {
        for relay in &mut self.relays {
            relay.close().await;
        }
        self.relays.clear();
    }
}
