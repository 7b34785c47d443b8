//! Thread-safe order book storage shared across exchanges.

mod shared_book;

pub use shared_book::{ExchangeBooks, OrderBookManager, QualifiedKey, SharedOrderBook};
