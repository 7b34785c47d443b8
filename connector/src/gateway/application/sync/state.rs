use std::collections::VecDeque;

use market_core::DepthUpdateEvent;

/// Observable phase of one book's synchronization state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// A fresh snapshot is required before diffs can be trusted.
    AwaitingSnapshot,
    /// A snapshot fetch job is in flight.
    FetchingSnapshot,
    /// Snapshot loaded; the first diff still has to bridge onto it.
    InitialSyncPending,
    /// Steady state: diffs are applied as they drain.
    Synced,
}

/// Per-key synchronization record: phase flags plus the pending diff
/// buffer. Created lazily on the first diff for a key and reset in
/// place on resync.
#[derive(Debug)]
pub(super) struct SyncState {
    buffer: VecDeque<DepthUpdateEvent>,
    capacity: usize,
    /// A snapshot fetch is in flight; guards against duplicate jobs.
    pub fetching_book: bool,
    /// A fresh snapshot is required before diffs can be trusted.
    pub needs_fetching_book: bool,
    /// True until the first diff has bridged onto a fresh snapshot.
    pub initial_sync: bool,
    /// Last sequence number accepted into the buffer. Validates stream
    /// self-continuity, independent of the book's own sequence.
    pub last_update_id: u64,
}

impl SyncState {
    pub fn new(capacity: usize) -> Self {
        SyncState {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            fetching_book: false,
            needs_fetching_book: true,
            initial_sync: true,
            last_update_id: 0,
        }
    }

    /// Enqueue a diff, dropping the oldest entry if the buffer is full.
    /// The newest event is never lost; the gap a dropped event may
    /// leave behind is caught by validation at drain time.
    pub fn push(&mut self, event: DepthUpdateEvent) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn pop(&mut self) -> Option<DepthUpdateEvent> {
        self.buffer.pop_front()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Reset to the bootstrap state, discarding buffered diffs.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.fetching_book = false;
        self.needs_fetching_book = true;
        self.initial_sync = true;
        self.last_update_id = 0;
    }

    pub fn phase(&self) -> SyncPhase {
        if self.fetching_book {
            SyncPhase::FetchingSnapshot
        } else if self.needs_fetching_book {
            SyncPhase::AwaitingSnapshot
        } else if self.initial_sync {
            SyncPhase::InitialSyncPending
        } else {
            SyncPhase::Synced
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(first: u64, last: u64) -> DepthUpdateEvent {
        DepthUpdateEvent {
            symbol: "BTCUSDT".to_string(),
            event_time: 0,
            first_update_id: first,
            final_update_id: last,
            bids: vec![],
            asks: vec![],
        }
    }

    #[test]
    fn test_new_state_awaits_snapshot() {
        let state = SyncState::new(4);
        assert_eq!(state.phase(), SyncPhase::AwaitingSnapshot);
        assert!(state.needs_fetching_book);
        assert!(state.initial_sync);
        assert!(!state.fetching_book);
        assert_eq!(state.last_update_id, 0);
    }

    #[test]
    fn test_buffer_drops_oldest_on_overflow() {
        let mut state = SyncState::new(3);
        for i in 1..=5u64 {
            state.push(diff(i, i));
        }
        assert_eq!(state.buffered(), 3);
        // Oldest two dropped; newest always retained.
        assert_eq!(state.buffer.front().unwrap().first_update_id, 3);
        let newest = state.buffer.back().unwrap();
        assert_eq!(newest.final_update_id, 5);
    }

    #[test]
    fn test_phase_transitions() {
        let mut state = SyncState::new(4);
        state.fetching_book = true;
        assert_eq!(state.phase(), SyncPhase::FetchingSnapshot);

        state.fetching_book = false;
        state.needs_fetching_book = false;
        assert_eq!(state.phase(), SyncPhase::InitialSyncPending);

        state.initial_sync = false;
        assert_eq!(state.phase(), SyncPhase::Synced);
    }

    #[test]
    fn test_reset_is_in_place() {
        let mut state = SyncState::new(4);
        state.push(diff(1, 5));
        state.fetching_book = true;
        state.needs_fetching_book = false;
        state.initial_sync = false;
        state.last_update_id = 5;

        state.reset();

        assert_eq!(state.buffered(), 0);
        assert_eq!(state.phase(), SyncPhase::AwaitingSnapshot);
        assert_eq!(state.last_update_id, 0);
    }
}
