use thiserror::Error;

use crate::gateway::domain::BookKey;
use crate::gateway::infrastructure::RestError;

/// Failures raised while synchronizing one book.
///
/// All variants are scoped to a single key; none of them affect other
/// books or the worker pool. They are operational signals that drive
/// automatic resynchronization, never surfaced to end users.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The raw diff stream skipped a sequence number, detected before
    /// any book was touched.
    #[error("stream gap for {key}: expected first update {expected}, got {got}")]
    StreamGap { key: BookKey, expected: u64, got: u64 },

    /// The first post-snapshot diff does not bridge the snapshot
    /// boundary.
    #[error(
        "initial sync gap for {key}: book at {book_last}, first buffered diff covers {first}..={last}"
    )]
    InitialSyncGap {
        key: BookKey,
        book_last: u64,
        first: u64,
        last: u64,
    },

    /// REST snapshot fetch failed; the key stays eligible for retry on
    /// the next diff.
    #[error("snapshot fetch failed for {key}: {source}")]
    SnapshotFetch { key: BookKey, source: RestError },

    /// Snapshot job queue is full. Not fatal: scheduling is retried on
    /// the next diff arrival.
    #[error("snapshot job queue full, dropping fetch request for {key}")]
    SchedulingBackpressure { key: BookKey },

    /// The book store rejected an update it was handed.
    #[error("book store rejected update {first}..={last} for {key}")]
    BookApply { key: BookKey, first: u64, last: u64 },
}

impl SyncError {
    /// Backpressure is the one failure that does not force a resync.
    pub fn forces_resync(&self) -> bool {
        !matches!(self, SyncError::SchedulingBackpressure { .. })
    }
}
