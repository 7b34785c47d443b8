//! Gateway module: keeps locally-held order books synchronized with
//! remote venues.
//!
//! Follows the usual four layers:
//! - **Config**: JSON configuration for multiple exchanges and sync tuning
//! - **Domain**: keys, events, and the collaborator traits
//! - **Application**: the synchronization engine and per-exchange handlers
//! - **Infrastructure**: REST and WebSocket clients, stream parsers
//!
//! The hard core is [`application::BookSynchronizer`]: it buffers
//! incoming depth diffs per book key, bootstraps books from REST
//! snapshots through a bounded worker pool, validates update-sequence
//! continuity, and throws a book away for resynchronization whenever
//! validation fails. Everything else in this module is request/response
//! plumbing around it.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Config layer
pub use config::{
    ConfigError, ConnectorConfigFile, ExchangeConfig, GlobalConfig, PairConfig, SyncConfigJson,
    load_config, load_config_from_str,
};

// Domain layer
pub use domain::{
    AssetClass, BookKey, BookStore, Currency, DepthFetcher, ExchangeId, StreamData, StreamParser,
    UnknownAssetClass, WsEvent, WsRequest,
};

// Application layer
pub use application::{
    BookSynchronizer, ExchangeManager, MarketDataHandler, SyncConfig, SyncError, SyncPhase,
};

// Infrastructure layer
pub use infrastructure::{
    DepthParser, RestClient, RestError, TradeParser, WsClient, WsError, WsRequestSender,
};
