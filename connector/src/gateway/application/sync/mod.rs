//! Order book synchronization engine.
//!
//! Buffers incoming depth diffs per [`BookKey`], bootstraps books from
//! REST snapshots through a bounded job queue and worker pool, and
//! validates update-sequence continuity before anything touches the
//! shared book store. Any validation failure invalidates the book and
//! re-arms bootstrap; the next diff for the key restarts the cycle.
//!
//! [`BookKey`]: crate::gateway::domain::BookKey

mod engine;
mod error;
mod state;
mod worker;

pub use engine::BookSynchronizer;
pub use error::SyncError;
pub use state::SyncPhase;
