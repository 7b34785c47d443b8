mod config;
mod exchange_manager;
mod market_data_handler;
mod sync;

pub use config::SyncConfig;
pub use exchange_manager::ExchangeManager;
pub use market_data_handler::MarketDataHandler;
pub use sync::{BookSynchronizer, SyncError, SyncPhase};
