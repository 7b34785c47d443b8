//! End-to-end synchronization lifecycle tests: engine + worker pool +
//! book store, with a scripted REST collaborator.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use market_core::{DepthSnapshotEvent, DepthUpdateEvent};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};

use connector::gateway::{
    BookKey, BookSynchronizer, DepthFetcher, RestError, SyncConfig, SyncPhase,
};
use connector::order_book::{ExchangeBooks, OrderBookManager};

fn key() -> BookKey {
    BookKey::spot("BTC", "USDT")
}

fn diff(first: u64, last: u64, bid_price: &str, bid_qty: &str) -> DepthUpdateEvent {
    DepthUpdateEvent {
        symbol: "BTCUSDT".to_string(),
        event_time: 1_700_000_000_000,
        first_update_id: first,
        final_update_id: last,
        bids: vec![[bid_price.to_string(), bid_qty.to_string()]],
        asks: vec![],
    }
}

fn snapshot(last_update_id: u64) -> DepthSnapshotEvent {
    DepthSnapshotEvent {
        last_update_id,
        bids: vec![["50000".to_string(), "1.0".to_string()]],
        asks: vec![["50100".to_string(), "2.0".to_string()]],
    }
}

/// Returns scripted responses in order, then repeats the fallback.
/// Optionally blocks each call on a gate until the test releases it.
struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<DepthSnapshotEvent, RestError>>>,
    fallback: DepthSnapshotEvent,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFetcher {
    fn new(
        responses: Vec<Result<DepthSnapshotEvent, RestError>>,
        fallback: DepthSnapshotEvent,
    ) -> Arc<Self> {
        Arc::new(ScriptedFetcher {
            responses: Mutex::new(responses.into()),
            fallback,
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    fn gated(fallback: DepthSnapshotEvent, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(ScriptedFetcher {
            responses: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Cloneable handle so tests keep access to the call counter after the
/// engine takes ownership of its fetcher.
#[derive(Clone)]
struct SharedFetcher(Arc<ScriptedFetcher>);

#[async_trait]
impl DepthFetcher for SharedFetcher {
    async fn fetch_depth(
        &self,
        _key: &BookKey,
        _limit: Option<u32>,
    ) -> Result<DepthSnapshotEvent, RestError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.0.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }
        let scripted = self.0.responses.lock().pop_front();
        scripted.unwrap_or(Ok(self.0.fallback.clone()))
    }
}

fn engine(
    fetcher: &Arc<ScriptedFetcher>,
    workers: usize,
    books: &OrderBookManager,
) -> Arc<BookSynchronizer<ExchangeBooks, SharedFetcher>> {
    let sync = BookSynchronizer::new(
        SyncConfig::new("testex")
            .with_worker_count(workers)
            .with_buffer_capacity(16),
        books.scoped("testex"),
        SharedFetcher(Arc::clone(fetcher)),
    );
    sync
}

async fn wait_for_phase(
    sync: &BookSynchronizer<ExchangeBooks, SharedFetcher>,
    key: &BookKey,
    phase: SyncPhase,
) {
    timeout(Duration::from_secs(2), async {
        loop {
            if sync.phase(key) == Some(phase) {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {phase:?}, at {:?}", sync.phase(key)));
}

#[tokio::test]
async fn bootstrap_reaches_synced_through_worker_pool() {
    let books = OrderBookManager::new();
    let fetcher = ScriptedFetcher::new(vec![], snapshot(160));
    let sync = engine(&fetcher, 2, &books);
    sync.start();
    let key = key();

    // Diff arrives first; snapshot bootstrap happens asynchronously.
    let _ = sync.process(&key, diff(161, 165, "50001", "3.0"));
    wait_for_phase(&sync, &key, SyncPhase::Synced).await;

    let book = books.book("testex", key.clone());
    assert_eq!(book.last_update_id(), 165);
    assert_eq!(book.best_bid().unwrap().price.to_string(), "50001");
    assert_eq!(fetcher.calls(), 1);

    // Steady state applies directly.
    sync.process(&key, diff(166, 170, "50002", "1.0")).unwrap();
    assert_eq!(book.last_update_id(), 170);
    assert_eq!(book.best_bid().unwrap().price.to_string(), "50002");

    sync.shutdown();
}

#[tokio::test]
async fn converges_after_fetch_failures() {
    let books = OrderBookManager::new();
    let fetcher = ScriptedFetcher::new(
        vec![Err(RestError::Status(502)), Err(RestError::Status(502))],
        snapshot(160),
    );
    let sync = engine(&fetcher, 2, &books);
    sync.start();
    let key = key();

    // Each failed fetch resets the key; each subsequent diff re-arms it.
    // The pauses let the in-flight fetch settle before the next diff.
    for first in [101u64, 111, 161] {
        let _ = sync.process(&key, diff(first, first + 4, "50000", "1.0"));
        sleep(Duration::from_millis(100)).await;
    }
    wait_for_phase(&sync, &key, SyncPhase::Synced).await;

    assert_eq!(books.book("testex", key).last_update_id(), 165);
    assert!(fetcher.calls() >= 3);
    sync.shutdown();
}

#[tokio::test]
async fn concurrent_requests_issue_one_fetch() {
    let gate = Arc::new(Semaphore::new(0));
    let books = OrderBookManager::new();
    let fetcher = ScriptedFetcher::gated(snapshot(160), Arc::clone(&gate));
    let sync = engine(&fetcher, 4, &books);
    sync.start();
    let key = key();

    // First request puts the fetch in flight (blocked on the gate);
    // every further request must be a no-op.
    sync.request_snapshot(&key).unwrap();
    wait_for_phase(&sync, &key, SyncPhase::FetchingSnapshot).await;
    for _ in 0..50 {
        sync.request_snapshot(&key).unwrap();
    }
    let _ = sync.process(&key, diff(161, 165, "50000", "1.0"));

    gate.add_permits(1);
    wait_for_phase(&sync, &key, SyncPhase::Synced).await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(books.book("testex", key).last_update_id(), 165);
    sync.shutdown();
}

#[tokio::test]
async fn shutdown_drains_queue_without_fetching() {
    let gate = Arc::new(Semaphore::new(0));
    let books = OrderBookManager::new();
    let fetcher = ScriptedFetcher::gated(snapshot(10), Arc::clone(&gate));
    let sync = engine(&fetcher, 1, &books);
    let workers = sync.start();

    let busy = BookKey::spot("BTC", "USDT");
    let queued_a = BookKey::spot("ETH", "USDT");
    let queued_b = BookKey::spot("SOL", "USDT");

    // One fetch in flight (blocked), two jobs stuck behind it.
    sync.request_snapshot(&busy).unwrap();
    wait_for_phase(&sync, &busy, SyncPhase::FetchingSnapshot).await;
    sync.request_snapshot(&queued_a).unwrap();
    sync.request_snapshot(&queued_b).unwrap();

    sync.shutdown();
    gate.add_permits(10);
    for worker in workers {
        worker.await.unwrap();
    }

    // Only the in-flight fetch ran; queued keys stay eligible for
    // bootstrap and no partial book state exists for them.
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(sync.phase(&queued_a), Some(SyncPhase::AwaitingSnapshot));
    assert_eq!(sync.phase(&queued_b), Some(SyncPhase::AwaitingSnapshot));
    assert!(!books.book("testex", queued_a).is_initialized());
    assert!(!books.book("testex", queued_b).is_initialized());
}

#[tokio::test]
async fn stream_gap_recovers_without_affecting_other_keys() {
    let books = OrderBookManager::new();
    let fetcher = ScriptedFetcher::new(
        vec![Ok(snapshot(160)), Ok(snapshot(40))],
        snapshot(300),
    );
    let sync = engine(&fetcher, 2, &books);
    sync.start();
    let btc = BookKey::spot("BTC", "USDT");
    let eth = BookKey::spot("ETH", "USDT");

    // Bootstrap one key at a time so the scripted snapshots pair up
    // with the key whose fetch consumes them.
    let _ = sync.process(&btc, diff(161, 165, "50000", "1.0"));
    wait_for_phase(&sync, &btc, SyncPhase::Synced).await;
    let _ = sync.process(&eth, diff(41, 45, "3000", "1.0"));
    wait_for_phase(&sync, &eth, SyncPhase::Synced).await;

    // BTC stream gaps; ETH keeps applying.
    assert!(sync.process(&btc, diff(200, 205, "50000", "1.0")).is_err());
    sync.process(&eth, diff(46, 50, "3001", "2.0")).unwrap();
    assert_eq!(books.book("testex", eth.clone()).last_update_id(), 50);

    // BTC converges again from the fallback snapshot.
    let _ = sync.process(&btc, diff(301, 305, "50005", "1.0"));
    wait_for_phase(&sync, &btc, SyncPhase::Synced).await;
    assert_eq!(books.book("testex", btc).last_update_id(), 305);

    sync.shutdown();
}
