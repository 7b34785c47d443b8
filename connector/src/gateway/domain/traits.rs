use async_trait::async_trait;
use market_core::{DepthSnapshotEvent, DepthUpdateEvent};

use super::events::StreamData;
use super::keys::BookKey;
use crate::gateway::infrastructure::RestError;

/// Fetches full depth snapshots from the venue's REST API.
#[async_trait]
pub trait DepthFetcher: Send + Sync {
    async fn fetch_depth(
        &self,
        key: &BookKey,
        limit: Option<u32>,
    ) -> Result<DepthSnapshotEvent, RestError>;
}

/// Thread-safe store of order books, keyed per book.
///
/// The synchronization engine owns all sequence validation; the store
/// only rejects updates that violate its own internal invariants
/// (uninitialized book, non-advancing sequence number).
pub trait BookStore: Send + Sync {
    /// Replace the book for `key` wholesale with the snapshot contents.
    fn load_snapshot(&self, key: &BookKey, snapshot: &DepthSnapshotEvent);

    /// Apply an incremental update. Returns false if the store rejects it.
    fn apply_update(&self, key: &BookKey, update: &DepthUpdateEvent) -> bool;

    /// Flush the book for `key` so stale readers cannot observe it.
    fn invalidate(&self, key: &BookKey);

    /// Sequence number the stored book is at; 0 if absent or invalidated.
    fn last_update_id(&self, key: &BookKey) -> u64;
}

/// Parses raw stream payloads into [`StreamData`].
pub trait StreamParser: Send + Sync {
    /// Check if this parser handles the given stream name.
    fn can_parse(&self, stream: &str) -> bool;

    /// Parse the stream payload. Returns None if parsing fails.
    fn parse(&self, stream: &str, data: &serde_json::Value) -> Option<StreamData>;
}
