use crate::gateway::domain::ExchangeId;

/// Tuning for one exchange's synchronization engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Exchange this engine synchronizes against.
    pub exchange_id: ExchangeId,
    /// Per-key diff buffer capacity; overflow drops the oldest entry.
    pub buffer_capacity: usize,
    /// Bound on queued snapshot fetch jobs across all keys.
    pub job_queue_capacity: usize,
    /// Fixed number of snapshot workers.
    pub worker_count: usize,
    /// Depth limit passed to the REST snapshot endpoint.
    pub snapshot_depth: Option<u32>,
}

impl SyncConfig {
    pub fn new(exchange_id: impl Into<ExchangeId>) -> Self {
        SyncConfig {
            exchange_id: exchange_id.into(),
            buffer_capacity: 150,
            job_queue_capacity: 2000,
            worker_count: 10,
            snapshot_depth: Some(1000),
        }
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_job_queue_capacity(mut self, capacity: usize) -> Self {
        self.job_queue_capacity = capacity;
        self
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_snapshot_depth(mut self, depth: Option<u32>) -> Self {
        self.snapshot_depth = depth;
        self
    }
}
