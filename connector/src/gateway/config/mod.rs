mod types;

use std::path::Path;

use thiserror::Error;

pub use types::{ConnectorConfigFile, ExchangeConfig, GlobalConfig, PairConfig, SyncConfigJson};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no exchanges configured")]
    NoExchanges,
}

/// Load and validate configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConnectorConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load and validate configuration from a JSON string.
pub fn load_config_from_str(contents: &str) -> Result<ConnectorConfigFile, ConfigError> {
    let config: ConnectorConfigFile = serde_json::from_str(contents)?;
    if config.exchanges.is_empty() {
        return Err(ConfigError::NoExchanges);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::domain::AssetClass;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(
            r#"{
                "exchanges": [
                    {
                        "id": "binance",
                        "name": "Binance",
                        "rest_url": "https://api.binance.com",
                        "ws_url": "wss://stream.binance.com:9443/ws",
                        "pairs": [
                            { "base": "BTC", "quote": "USDT" },
                            { "base": "ETH", "quote": "USDT", "asset": "futures" }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let exchange = &config.exchanges[0];
        assert!(exchange.enabled);
        assert_eq!(exchange.pairs.len(), 2);
        assert_eq!(exchange.pairs[0].asset, AssetClass::Spot);
        assert_eq!(exchange.pairs[1].asset, AssetClass::Futures);
        assert_eq!(exchange.sync.buffer_capacity, 150);
        assert_eq!(exchange.sync.job_queue_capacity, 2000);
        assert_eq!(exchange.sync.worker_count, 10);
        assert_eq!(config.global.max_reconnect_attempts, 10);
    }

    #[test]
    fn test_empty_exchanges_rejected() {
        let result = load_config_from_str(r#"{ "exchanges": [] }"#);
        assert!(matches!(result, Err(ConfigError::NoExchanges)));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            load_config_from_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
