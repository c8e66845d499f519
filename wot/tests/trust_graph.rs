//! End-to-end tests of the trust-graph engine against in-process relays.

mod support;

use std::sync::Arc;
use std::time::Duration;

use palisade_store::{EventStore, MemoryEventStore};
use palisade_wot::{WotEngine, WotOptions};

use support::{contact_list, init_tracing, pubkey, MockBehavior, MockRelay};

const ANCHOR: u8 = 0xaa;

fn options(relay_urls: Vec<String>) -> WotOptions {
    WotOptions {
        trust_anchor: Some(pubkey(ANCHOR)),
        trust_depth: 2,
        relay_urls,
        connect_timeout: Duration::from_secs(2),
        query_timeout: Duration::from_millis(500),
        ..WotOptions::default()
    }
}

/// anchor → b → c, served by one relay.
fn two_hop_graph() -> Vec<palisade_types::Event> {
    vec![
        contact_list(1, &pubkey(ANCHOR), &[pubkey(0xb1)], 100),
        contact_list(2, &pubkey(0xb1), &[pubkey(0xc1)], 100),
    ]
}

#[tokio::test]
async fn refresh_builds_two_hop_trust_set() {
    init_tracing();
    let relay = MockRelay::serving(two_hop_graph()).await;

    let engine = WotEngine::new(options(vec![relay.url.clone()])).unwrap();
    engine.init().await.unwrap();

    assert!(engine.is_trusted(&pubkey(ANCHOR)));
    assert!(engine.is_trusted(&pubkey(0xb1)));
    assert!(engine.is_trusted(&pubkey(0xc1)));
    assert!(!engine.is_trusted(&pubkey(0xdd)));
    assert_eq!(engine.trusted_count(), 3);
    assert!(engine.last_refreshed_at() > 0);

    engine.destroy();
}

#[tokio::test]
async fn depth_one_stops_at_direct_follows() {
    let relay = MockRelay::serving(two_hop_graph()).await;

    let engine = WotEngine::new(WotOptions {
        trust_depth: 1,
        ..options(vec![relay.url.clone()])
    })
    .unwrap();
    engine.refresh().await.unwrap();

    assert!(engine.is_trusted(&pubkey(0xb1)));
    assert!(!engine.is_trusted(&pubkey(0xc1)));
    assert_eq!(engine.trusted_count(), 2);
}

#[tokio::test]
async fn configured_depth_beyond_two_equals_depth_two() {
    let relay = MockRelay::serving(two_hop_graph()).await;

    let deep = WotEngine::new(WotOptions {
        trust_depth: 99,
        ..options(vec![relay.url.clone()])
    })
    .unwrap();
    deep.refresh().await.unwrap();

    let two = WotEngine::new(options(vec![relay.url.clone()])).unwrap();
    two.refresh().await.unwrap();

    assert_eq!(deep.trusted_count(), two.trusted_count());
    assert_eq!(deep.trusted_count(), 3);
}

#[tokio::test]
async fn refresh_is_idempotent_for_unchanged_data() {
    let relay = MockRelay::serving(two_hop_graph()).await;
    let engine = WotEngine::new(options(vec![relay.url.clone()])).unwrap();

    engine.refresh().await.unwrap();
    let first_count = engine.trusted_count();

    engine.refresh().await.unwrap();
    assert_eq!(engine.trusted_count(), first_count);
    for seed in [ANCHOR, 0xb1, 0xc1] {
        assert!(engine.is_trusted(&pubkey(seed)));
    }
}

#[tokio::test]
async fn offline_relays_fall_back_to_the_local_store() {
    init_tracing();
    let store = Arc::new(MemoryEventStore::new());
    store.insert(contact_list(1, &pubkey(ANCHOR), &[pubkey(0xb1)], 100));
    store.insert(contact_list(2, &pubkey(0xb1), &[pubkey(0xc1)], 100));

    // Nothing listens on these ports.
    let engine = WotEngine::new(WotOptions {
        store: Some(store as Arc<dyn EventStore>),
        connect_timeout: Duration::from_millis(300),
        ..options(vec!["ws://127.0.0.1:1".into(), "ws://127.0.0.1:2".into()])
    })
    .unwrap();
    engine.refresh().await.unwrap();

    assert_eq!(engine.trusted_count(), 3);
    assert!(engine.is_trusted(&pubkey(0xc1)));
}

#[tokio::test]
async fn no_sources_at_all_leaves_only_the_anchor() {
    let engine = WotEngine::new(options(vec![])).unwrap();
    engine.refresh().await.unwrap();

    assert_eq!(engine.trusted_count(), 1);
    assert!(engine.is_trusted(&pubkey(ANCHOR)));
}

#[tokio::test]
async fn newest_contact_list_wins_across_sources() {
    // The relay has a newer contact list for the anchor than the store.
    let relay = MockRelay::serving(vec![contact_list(
        1,
        &pubkey(ANCHOR),
        &[pubkey(0xc1)],
        200,
    )])
    .await;
    let store = Arc::new(MemoryEventStore::new());
    store.insert(contact_list(2, &pubkey(ANCHOR), &[pubkey(0xb1)], 100));

    let engine = WotEngine::new(WotOptions {
        trust_depth: 1,
        store: Some(store as Arc<dyn EventStore>),
        ..options(vec![relay.url.clone()])
    })
    .unwrap();
    engine.refresh().await.unwrap();

    assert!(engine.is_trusted(&pubkey(0xc1)), "newer remote list wins");
    assert!(!engine.is_trusted(&pubkey(0xb1)), "stale local list ignored");
}

#[tokio::test]
async fn newer_local_list_beats_stale_remote() {
    let relay = MockRelay::serving(vec![contact_list(
        1,
        &pubkey(ANCHOR),
        &[pubkey(0xc1)],
        100,
    )])
    .await;
    let store = Arc::new(MemoryEventStore::new());
    store.insert(contact_list(2, &pubkey(ANCHOR), &[pubkey(0xb1)], 200));

    let engine = WotEngine::new(WotOptions {
        trust_depth: 1,
        store: Some(store as Arc<dyn EventStore>),
        ..options(vec![relay.url.clone()])
    })
    .unwrap();
    engine.refresh().await.unwrap();

    assert!(engine.is_trusted(&pubkey(0xb1)));
    assert!(!engine.is_trusted(&pubkey(0xc1)));
}

#[tokio::test]
async fn readers_never_observe_a_partial_set() {
    // A slow relay keeps the refresh in flight while we sample.
    let relay = MockRelay::spawn(MockBehavior {
        events: two_hop_graph(),
        response_delay: Duration::from_millis(200),
    })
    .await;

    let engine = WotEngine::new(options(vec![relay.url.clone()])).unwrap();
    let refresher = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.refresh().await })
    };

    // The set is empty until the swap and complete afterwards; no sample
    // may catch an intermediate size.
    loop {
        let count = engine.trusted_count();
        assert!(count == 0 || count == 3, "observed partial set: {count}");
        if refresher.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    refresher.await.unwrap().unwrap();
    assert_eq!(engine.trusted_count(), 3);
}

#[tokio::test]
async fn destroy_discards_an_inflight_refresh() {
    let relay = MockRelay::spawn(MockBehavior {
        events: two_hop_graph(),
        response_delay: Duration::from_millis(300),
    })
    .await;

    let engine = WotEngine::new(options(vec![relay.url.clone()])).unwrap();
    let refresher = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.refresh().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.destroy();

    refresher.await.unwrap().unwrap();
    assert_eq!(engine.trusted_count(), 0, "stale result must be discarded");
}

#[tokio::test]
async fn scheduler_keeps_refreshing() {
    let relay = MockRelay::serving(two_hop_graph()).await;

    let engine = WotEngine::new(WotOptions {
        refresh_interval: Some(Duration::from_millis(100)),
        ..options(vec![relay.url.clone()])
    })
    .unwrap();
    engine.init().await.unwrap();
    let first = engine.last_refreshed_at();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(engine.last_refreshed_at() > first);

    engine.destroy();
}
