use std::collections::HashMap;
use std::sync::Arc;

use market_core::DepthUpdateEvent;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::gateway::application::config::SyncConfig;
use crate::gateway::domain::{BookKey, BookStore, DepthFetcher};

use super::error::SyncError;
use super::state::{SyncPhase, SyncState};
use super::worker;

/// Synchronization engine for streamed order books.
///
/// One instance per exchange connection. Owns the key -> [`SyncState`]
/// registry behind a single coarse lock; every read-modify-write on a
/// state (stage, schedule, drain, cleanup) happens while holding it and
/// performs no network I/O. Snapshot fetches run on a bounded worker
/// pool, outside the lock, with only the bracketing flag flips and the
/// buffer drain taken under it.
///
/// Keys are fully independent: a failure on one book never affects
/// another book's state or the worker pool's ability to service it.
pub struct BookSynchronizer<B, F> {
    config: SyncConfig,
    states: Mutex<HashMap<BookKey, SyncState>>,
    books: Arc<B>,
    fetcher: Arc<F>,
    jobs: mpsc::Sender<BookKey>,
    job_rx: Mutex<Option<mpsc::Receiver<BookKey>>>,
    shutdown: watch::Sender<bool>,
}

impl<B, F> BookSynchronizer<B, F>
where
    B: BookStore + 'static,
    F: DepthFetcher + 'static,
{
    pub fn new(config: SyncConfig, books: B, fetcher: F) -> Arc<Self> {
        let (jobs, job_rx) = mpsc::channel(config.job_queue_capacity);
        let (shutdown, _) = watch::channel(false);

        Arc::new(BookSynchronizer {
            config,
            states: Mutex::new(HashMap::new()),
            books: Arc::new(books),
            fetcher: Arc::new(fetcher),
            jobs,
            job_rx: Mutex::new(Some(job_rx)),
            shutdown,
        })
    }

    /// Spawn the snapshot worker pool. Callable once; subsequent calls
    /// return no handles.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let Some(rx) = self.job_rx.lock().take() else {
            tracing::warn!(exchange = %self.config.exchange_id, "synchronizer already started");
            return Vec::new();
        };

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        (0..self.config.worker_count)
            .map(|id| {
                let sync = Arc::clone(self);
                let rx = Arc::clone(&rx);
                let shutdown = self.shutdown.subscribe();
                tokio::spawn(worker::run(id, sync, rx, shutdown))
            })
            .collect()
    }

    /// Signal workers to stop. Pending jobs are drained without being
    /// executed; their keys stay eligible for bootstrap.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Stage a diff and immediately attempt reconciliation.
    ///
    /// Staging and reconciliation can fail independently; a stream gap
    /// or a drain failure forces a resync here, while scheduling
    /// backpressure is only logged and retried on the next diff.
    pub fn process(&self, key: &BookKey, event: DepthUpdateEvent) -> Result<(), SyncError> {
        let staged = self.stage(key, event);
        if let Err(err) = &staged {
            tracing::warn!(key = %key, error = %err, "diff stream discontinuity, forcing resync");
            self.cleanup(key);
        }

        let reconciled = self.reconcile(key);
        if let Err(err) = &reconciled {
            if err.forces_resync() {
                tracing::warn!(key = %key, error = %err, "reconciliation failed, forcing resync");
                self.cleanup(key);
            } else {
                tracing::warn!(key = %key, error = %err, "snapshot scheduling backpressure");
            }
        }

        staged.and(reconciled)
    }

    /// Validate stream self-continuity and enqueue the diff.
    ///
    /// The buffer is left untouched when the raw stream itself skipped
    /// a sequence number; the book has not been consulted yet at this
    /// point.
    pub fn stage(&self, key: &BookKey, event: DepthUpdateEvent) -> Result<(), SyncError> {
        let mut states = self.states.lock();
        let state = states
            .entry(key.clone())
            .or_insert_with(|| SyncState::new(self.config.buffer_capacity));

        if state.last_update_id != 0 && event.first_update_id != state.last_update_id + 1 {
            return Err(SyncError::StreamGap {
                key: key.clone(),
                expected: state.last_update_id + 1,
                got: event.first_update_id,
            });
        }

        state.last_update_id = event.final_update_id;
        state.push(event);
        Ok(())
    }

    /// Drain the buffered diffs for `key` against the stored book.
    ///
    /// No-op while a snapshot fetch is in flight; schedules one when
    /// the key needs it. Invoked after every successful stage and after
    /// every snapshot load.
    pub fn reconcile(&self, key: &BookKey) -> Result<(), SyncError> {
        let mut states = self.states.lock();
        let Some(state) = states.get_mut(key) else {
            return Ok(());
        };

        if state.fetching_book {
            return Ok(());
        }
        if state.needs_fetching_book {
            return self.schedule_fetch(state, key);
        }

        self.drain(state, key)
    }

    /// Request a snapshot fetch for `key`. Non-blocking; a no-op when a
    /// fetch is already in flight.
    pub fn request_snapshot(&self, key: &BookKey) -> Result<(), SyncError> {
        let mut states = self.states.lock();
        let state = states
            .entry(key.clone())
            .or_insert_with(|| SyncState::new(self.config.buffer_capacity));
        self.schedule_fetch(state, key)
    }

    /// Reset `key` to the bootstrap state and invalidate its stored
    /// book. Idempotent and safe to call from any phase.
    ///
    /// Clearing `fetching_book` abandons a fetch already in flight; a
    /// late result still lands through the worker path, where the
    /// drain re-validates it, so overlapping fetches converge on the
    /// newest snapshot.
    pub fn cleanup(&self, key: &BookKey) {
        let mut states = self.states.lock();
        if let Some(state) = states.get_mut(key) {
            self.reset_state(state, key);
        }
    }

    /// Observable phase of one key's state machine.
    pub fn phase(&self, key: &BookKey) -> Option<SyncPhase> {
        self.states.lock().get(key).map(|s| s.phase())
    }

    /// Number of diffs currently buffered for `key`.
    pub fn buffered(&self, key: &BookKey) -> usize {
        self.states.lock().get(key).map_or(0, |s| s.buffered())
    }

    /// Shared book store this engine seeds and advances.
    pub fn books(&self) -> &Arc<B> {
        &self.books
    }

    fn schedule_fetch(&self, state: &mut SyncState, key: &BookKey) -> Result<(), SyncError> {
        if state.fetching_book {
            return Ok(());
        }

        state.fetching_book = true;
        state.initial_sync = true;
        if self.jobs.try_send(key.clone()).is_err() {
            // Roll back so the next diff can retry the request.
            state.fetching_book = false;
            return Err(SyncError::SchedulingBackpressure { key: key.clone() });
        }

        Ok(())
    }

    fn drain(&self, state: &mut SyncState, key: &BookKey) -> Result<(), SyncError> {
        let mut book_last = self.books.last_update_id(key);

        while let Some(event) = state.pop() {
            // Already covered by the snapshot or a prior update.
            if event.is_stale(book_last) {
                continue;
            }

            if state.initial_sync {
                if !event.bridges(book_last) {
                    return Err(SyncError::InitialSyncGap {
                        key: key.clone(),
                        book_last,
                        first: event.first_update_id,
                        last: event.final_update_id,
                    });
                }
                state.initial_sync = false;
            }

            if !self.books.apply_update(key, &event) {
                return Err(SyncError::BookApply {
                    key: key.clone(),
                    first: event.first_update_id,
                    last: event.final_update_id,
                });
            }
            book_last = event.final_update_id;
        }

        Ok(())
    }

    fn reset_state(&self, state: &mut SyncState, key: &BookKey) {
        state.reset();
        self.books.invalidate(key);
    }

    /// Worker path: fetch a snapshot for `key`, seed the store, and
    /// drain whatever accumulated while the fetch was in flight. The
    /// REST call runs before the state lock is taken.
    pub(super) async fn execute_fetch(&self, key: BookKey) {
        let result = self
            .fetcher
            .fetch_depth(&key, self.config.snapshot_depth)
            .await;

        let mut states = self.states.lock();
        let Some(state) = states.get_mut(&key) else {
            return;
        };

        match result {
            Ok(snapshot) => {
                self.books.load_snapshot(&key, &snapshot);
                state.fetching_book = false;
                state.needs_fetching_book = false;
                tracing::debug!(
                    key = %key,
                    last_update_id = snapshot.last_update_id,
                    buffered = state.buffered(),
                    "snapshot loaded, draining buffer"
                );
                if let Err(err) = self.drain(state, &key) {
                    tracing::warn!(key = %key, error = %err, "failed to bridge buffered diffs onto snapshot");
                    self.reset_state(state, &key);
                }
            }
            Err(source) => {
                let err = SyncError::SnapshotFetch {
                    key: key.clone(),
                    source,
                };
                tracing::warn!(key = %key, error = %err, "snapshot fetch failed");
                self.reset_state(state, &key);
            }
        }
    }

    /// Shutdown path: a queued job is dropped without being executed;
    /// the key keeps needing a snapshot and retries on the next diff.
    pub(super) fn abandon_fetch(&self, key: &BookKey) {
        let mut states = self.states.lock();
        if let Some(state) = states.get_mut(key) {
            state.fetching_book = false;
        }
    }
}
