//! Trust-graph engine: traversal, refresh lifecycle, and admission check.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use palisade_client::relay::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_QUERY_TIMEOUT};
use palisade_client::RelayPool;
use palisade_guards::EventDecision;
use palisade_store::EventStore;
use palisade_types::{Event, Filter, Pubkey};

use crate::WotError;

/// Rejection message returned for events from untrusted authors.
pub const REJECT_MESSAGE: &str = "block: you are not in the trusted public keys list";

/// Hard cap on the traversal depth. Beyond two hops the traversal would
/// re-query already-visited pubkeys without suppressing them, so deeper
/// configurations are clamped rather than honored.
const MAX_TRUST_DEPTH: usize = 2;

/// Maximum number of authors per subscription filter.
const BATCH_SIZE: usize = 100;

/// Options for constructing a [`WotEngine`].
#[derive(Clone)]
pub struct WotOptions {
    pub enabled: bool,
    pub trust_anchor: Option<Pubkey>,
    /// Follow-hops from the anchor considered trusted. Clamped to 2.
    pub trust_depth: usize,
    pub relay_urls: Vec<String>,
    /// Events matching any of these filters bypass the trust check.
    pub skip_filters: Vec<Filter>,
    /// When set, a periodic refresh task is started by [`WotEngine::init`].
    pub refresh_interval: Option<Duration>,
    /// Local event store consulted alongside the remote relays.
    pub store: Option<Arc<dyn EventStore>>,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for WotOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            trust_anchor: None,
            trust_depth: 1,
            relay_urls: Vec::new(),
            skip_filters: Vec::new(),
            refresh_interval: None,
            store: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

struct Inner {
    enabled: AtomicBool,
    trust_anchor: RwLock<Option<Pubkey>>,
    trust_depth: AtomicUsize,
    relay_urls: Vec<String>,
    skip_filters: Vec<Filter>,
    store: Option<Arc<dyn EventStore>>,
    connect_timeout: Duration,
    query_timeout: Duration,
    refresh_interval: Option<Duration>,
    /// The published trust set. Replaced wholesale on refresh completion,
    /// never mutated in place; readers clone the `Arc` and check against a
    /// consistent snapshot.
    trusted: RwLock<Arc<HashSet<Pubkey>>>,
    /// Serializes refreshes so a scheduled trigger coalesces with an
    /// in-flight one instead of running concurrently.
    refresh_gate: tokio::sync::Mutex<()>,
    destroyed: AtomicBool,
    /// Unix millis of the last completed refresh.
    last_refreshed_at: AtomicU64,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

/// The web-of-trust engine.
///
/// Cheap to clone; all clones share the same state. A refresh creates a
/// fresh [`RelayPool`], walks the contact graph breadth-first from the trust
/// anchor, and atomically swaps the resulting pubkey set in. The admission
/// check reads the current snapshot and never blocks on a refresh.
#[derive(Clone)]
pub struct WotEngine {
    inner: Arc<Inner>,
}

impl WotEngine {
    /// Construct the engine. Fails fast when enabled without a trust anchor.
    pub fn new(options: WotOptions) -> Result<Self, WotError> {
        if options.enabled && options.trust_anchor.is_none() {
            return Err(WotError::MissingTrustAnchor);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(options.enabled),
                trust_anchor: RwLock::new(options.trust_anchor),
                trust_depth: AtomicUsize::new(options.trust_depth.min(MAX_TRUST_DEPTH)),
                relay_urls: options.relay_urls,
                skip_filters: options.skip_filters,
                store: options.store,
                connect_timeout: options.connect_timeout,
                query_timeout: options.query_timeout,
                refresh_interval: options.refresh_interval,
                trusted: RwLock::new(Arc::new(HashSet::new())),
                refresh_gate: tokio::sync::Mutex::new(()),
                destroyed: AtomicBool::new(false),
                last_refreshed_at: AtomicU64::new(0),
                scheduler: Mutex::new(None),
            }),
        })
    }

    /// Run one refresh synchronously, then start the periodic refresh task
    /// if an interval is configured. Admission decisions made after `init`
    /// returns are never made against an unpopulated set.
    pub async fn init(&self) -> Result<(), WotError> {
        self.refresh().await?;
        self.start_scheduler();
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable the guard. Enabling requires a trust anchor.
    /// Disabling keeps the current trust set (re-enabling is instant) but
    /// stops scheduled refreshes from doing work.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), WotError> {
        if enabled && self.trust_anchor().is_none() {
            return Err(WotError::MissingTrustAnchor);
        }
        self.inner.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    pub fn trust_anchor(&self) -> Option<Pubkey> {
        self.inner
            .trust_anchor
            .read()
            .expect("anchor lock poisoned")
            .clone()
    }

    pub fn set_trust_anchor(&self, pubkey: Pubkey) {
        *self
            .inner
            .trust_anchor
            .write()
            .expect("anchor lock poisoned") = Some(pubkey);
    }

    pub fn trust_depth(&self) -> usize {
        self.inner.trust_depth.load(Ordering::SeqCst)
    }

    pub fn set_trust_depth(&self, depth: usize) {
        self.inner
            .trust_depth
            .store(depth.min(MAX_TRUST_DEPTH), Ordering::SeqCst);
    }

    /// Unix millis of the last completed refresh, 0 if none completed yet.
    pub fn last_refreshed_at(&self) -> u64 {
        self.inner.last_refreshed_at.load(Ordering::SeqCst)
    }

    /// Size of the current trust set.
    pub fn trusted_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether `pubkey` is in the current trust set. Hot path: takes a
    /// brief read lock to clone the snapshot reference, then checks against
    /// that snapshot.
    pub fn is_trusted(&self, pubkey: &Pubkey) -> bool {
        self.snapshot().contains(pubkey)
    }

    /// The admission decision for one event: allow when the guard is
    /// disabled, when a skip filter matches, or when the author is trusted.
    pub fn check_event(&self, event: &Event) -> EventDecision {
        if !self.enabled()
            || self
                .inner
                .skip_filters
                .iter()
                .any(|filter| filter.matches(event))
            || self.is_trusted(&event.pubkey)
        {
            EventDecision::Allow
        } else {
            EventDecision::deny(REJECT_MESSAGE)
        }
    }

    /// Recompute the trust set.
    ///
    /// Walks the contact graph breadth-first from the anchor: per level the
    /// frontier is chunked into author batches, each batch queries the local
    /// store and the relay pool concurrently, and the newest contact list
    /// per author contributes its edges to the next frontier. Levels run
    /// strictly sequentially. On completion the visited union replaces the
    /// current set in one swap; a failure partway leaves the prior set
    /// authoritative.
    pub async fn refresh(&self) -> Result<(), WotError> {
        let _gate = self.inner.refresh_gate.lock().await;
        if !self.enabled() {
            return Ok(());
        }
        let Some(anchor) = self.trust_anchor() else {
            return Ok(());
        };

        let start = Instant::now();
        info!("refreshing trusted pubkey set");

        let mut pool = RelayPool::with_timeouts(
            self.inner.relay_urls.clone(),
            self.inner.connect_timeout,
            self.inner.query_timeout,
        );
        let connected = pool.connect_all().await;
        info!(
            relays = connected.len(),
            configured = self.inner.relay_urls.len(),
            "connected to relays"
        );

        let mut trusted: HashSet<Pubkey> = HashSet::from([anchor.clone()]);
        let mut frontier: HashSet<Pubkey> = HashSet::from([anchor]);
        let traversal: Result<(), WotError> = async {
            for level in 0..self.trust_depth() {
                frontier = self.next_depth_set(&pool, &frontier).await?;
                debug!(
                    level,
                    discovered = frontier.len(),
                    "traversal level complete"
                );
                trusted.extend(frontier.iter().cloned());
            }
            Ok(())
        }
        .await;
        pool.shutdown().await;
        traversal?;

        if self.inner.destroyed.load(Ordering::SeqCst) {
            // Torn down while we were traversing; the result is stale.
            return Ok(());
        }

        let size = trusted.len();
        *self.inner.trusted.write().expect("trust set lock poisoned") = Arc::new(trusted);
        self.inner
            .last_refreshed_at
            .store(unix_millis(), Ordering::SeqCst);
        info!(
            pubkeys = size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trusted pubkey set updated"
        );
        Ok(())
    }

    /// Stop the scheduler and clear the trust set. An in-flight refresh may
    /// still complete but its result is discarded.
    pub fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
        if let Some(task) = self
            .inner
            .scheduler
            .lock()
            .expect("scheduler lock poisoned")
            .take()
        {
            task.abort();
        }
        *self.inner.trusted.write().expect("trust set lock poisoned") = Arc::new(HashSet::new());
    }

    fn snapshot(&self) -> Arc<HashSet<Pubkey>> {
        self.inner
            .trusted
            .read()
            .expect("trust set lock poisoned")
            .clone()
    }

    fn start_scheduler(&self) {
        let Some(interval) = self.inner.refresh_interval else {
            return;
        };
        let mut scheduler = self
            .inner
            .scheduler
            .lock()
            .expect("scheduler lock poisoned");
        if scheduler.is_some() {
            return;
        }

        let engine = self.clone();
        *scheduler = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if engine.inner.destroyed.load(Ordering::SeqCst) {
                    break;
                }
                if !engine.enabled() {
                    continue;
                }
                if let Err(error) = engine.refresh().await {
                    warn!(%error, "scheduled refresh failed");
                }
            }
        }));
    }

    /// Contacts of every pubkey in `frontier`, one traversal level.
    async fn next_depth_set(
        &self,
        pool: &RelayPool,
        frontier: &HashSet<Pubkey>,
    ) -> Result<HashSet<Pubkey>, WotError> {
        let batches = chunk_authors(frontier, BATCH_SIZE);
        let results = join_all(
            batches
                .into_iter()
                .map(|authors| self.fetch_batch(pool, authors)),
        )
        .await;

        let mut next = HashSet::new();
        for result in results {
            next.extend(result?);
        }
        Ok(next)
    }

    /// Query the local store and the pool for one author batch, keep the
    /// newest contact list per author, and collect the followed pubkeys.
    async fn fetch_batch(
        &self,
        pool: &RelayPool,
        authors: Vec<Pubkey>,
    ) -> Result<HashSet<Pubkey>, WotError> {
        let filter = Filter::contact_lists(&authors);
        let (local, remote) =
            tokio::join!(self.find_local(filter.clone()), pool.fetch_events(&filter));

        let mut newest: HashMap<Pubkey, Event> = HashMap::new();
        for event in local?.into_iter().chain(remote) {
            match newest.get(&event.pubkey) {
                Some(existing) if existing.created_at > event.created_at => {}
                _ => {
                    newest.insert(event.pubkey.clone(), event);
                }
            }
        }

        let mut contacts = HashSet::new();
        for event in newest.values() {
            contacts.extend(event.contacts());
        }
        Ok(contacts)
    }

    async fn find_local(&self, filter: Filter) -> Result<Vec<Event>, WotError> {
        let Some(store) = self.inner.store.clone() else {
            return Ok(Vec::new());
        };
        let events = tokio::task::spawn_blocking(move || store.find(&filter))
            .await
            .map_err(|error| WotError::Task(error.to_string()))??;
        Ok(events)
    }
}

/// Split a frontier into author batches of at most `size` pubkeys.
fn chunk_authors(frontier: &HashSet<Pubkey>, size: usize) -> Vec<Vec<Pubkey>> {
    let mut chunks = Vec::new();
    let mut chunk = Vec::with_capacity(size.min(frontier.len()));
    for pubkey in frontier {
        chunk.push(pubkey.clone());
        if chunk.len() == size {
            chunks.push(std::mem::take(&mut chunk));
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
