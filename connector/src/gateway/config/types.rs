use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gateway::application::SyncConfig;
use crate::gateway::domain::{AssetClass, BookKey, ExchangeId};

/// Root configuration for the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfigFile {
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub global: GlobalConfig,
}

impl ConnectorConfigFile {
    pub fn enabled_exchanges(&self) -> Vec<&ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled).collect()
    }
}

/// Configuration for a single exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Unique identifier (e.g. "binance", "kraken").
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether this exchange is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// REST API base URL.
    pub rest_url: String,
    /// WebSocket URL.
    pub ws_url: String,
    /// API key for authenticated endpoints.
    #[serde(default)]
    pub api_key: String,
    /// Pairs to synchronize books for.
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
    /// Synchronization engine tuning.
    #[serde(default)]
    pub sync: SyncConfigJson,
}

/// One monitored pair, identifying a single book together with its
/// asset class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConfig {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub asset: AssetClass,
}

impl PairConfig {
    pub fn book_key(&self) -> BookKey {
        BookKey::new(self.base.as_str(), self.quote.as_str(), self.asset)
    }

    /// Depth diff stream name, e.g. `btcusdt@depth`.
    pub fn depth_stream(&self) -> String {
        format!("{}@depth", self.book_key().symbol().to_lowercase())
    }
}

/// Synchronization tuning (JSON representation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfigJson {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_job_queue_capacity")]
    pub job_queue_capacity: usize,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_snapshot_depth")]
    pub snapshot_depth: Option<u32>,
}

impl Default for SyncConfigJson {
    fn default() -> Self {
        SyncConfigJson {
            buffer_capacity: default_buffer_capacity(),
            job_queue_capacity: default_job_queue_capacity(),
            worker_count: default_worker_count(),
            snapshot_depth: default_snapshot_depth(),
        }
    }
}

impl SyncConfigJson {
    /// Convert to the application-layer engine configuration.
    pub fn to_sync_config(&self, exchange_id: ExchangeId) -> SyncConfig {
        SyncConfig::new(exchange_id)
            .with_buffer_capacity(self.buffer_capacity)
            .with_job_queue_capacity(self.job_queue_capacity)
            .with_worker_count(self.worker_count)
            .with_snapshot_depth(self.snapshot_depth)
    }
}

/// Settings that apply to all exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Delay between reconnection attempts in milliseconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Maximum number of consecutive reconnection attempts.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig {
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl GlobalConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_buffer_capacity() -> usize {
    150
}

fn default_job_queue_capacity() -> usize {
    2000
}

fn default_worker_count() -> usize {
    10
}

fn default_snapshot_depth() -> Option<u32> {
    Some(1000)
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}
