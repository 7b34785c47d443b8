use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::gateway::domain::{BookKey, BookStore, DepthFetcher};

use super::engine::BookSynchronizer;

/// Snapshot worker loop. A fixed number of these share one bounded job
/// queue, keeping the number of concurrently-outstanding REST fetches
/// predictable.
pub(super) async fn run<B, F>(
    id: usize,
    sync: Arc<BookSynchronizer<B, F>>,
    jobs: Arc<tokio::sync::Mutex<mpsc::Receiver<BookKey>>>,
    mut shutdown: watch::Receiver<bool>,
) where
    B: BookStore + 'static,
    F: DepthFetcher + 'static,
{
    loop {
        let key = {
            let mut rx = jobs.lock().await;
            if *shutdown.borrow() {
                drain_pending(&sync, &mut rx);
                None
            } else {
                tokio::select! {
                    changed = shutdown.changed() => {
                        // A closed shutdown channel also means stop.
                        let _ = changed;
                        drain_pending(&sync, &mut rx);
                        None
                    }
                    job = rx.recv() => job,
                }
            }
        };

        let Some(key) = key else {
            break;
        };
        sync.execute_fetch(key).await;
    }

    tracing::debug!(worker = id, "snapshot worker stopped");
}

/// Discard queued jobs without executing them. The affected keys keep
/// `needs_fetching_book` set and re-enter bootstrap on their next diff.
fn drain_pending<B, F>(sync: &BookSynchronizer<B, F>, rx: &mut mpsc::Receiver<BookKey>)
where
    B: BookStore + 'static,
    F: DepthFetcher + 'static,
{
    while let Ok(key) = rx.try_recv() {
        tracing::debug!(key = %key, "dropping queued snapshot job on shutdown");
        sync.abandon_fetch(&key);
    }
}
