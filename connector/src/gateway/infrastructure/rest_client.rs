use async_trait::async_trait;
use market_core::DepthSnapshotEvent;
use thiserror::Error;

use crate::gateway::domain::{BookKey, DepthFetcher};

#[derive(Debug, Error)]
pub enum RestError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// REST client for depth snapshots.
///
/// The snapshot endpoint is public on the venues this connector
/// targets; the API key header is attached when configured so the
/// request counts against the keyed rate-limit bucket.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        RestClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a full depth snapshot for `symbol`.
    pub async fn get_depth(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<DepthSnapshotEvent, RestError> {
        let mut request = self
            .http
            .get(format!("{}/api/v3/depth", self.base_url))
            .query(&[("symbol", symbol)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        if !self.api_key.is_empty() {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DepthFetcher for RestClient {
    async fn fetch_depth(
        &self,
        key: &BookKey,
        limit: Option<u32>,
    ) -> Result<DepthSnapshotEvent, RestError> {
        self.get_depth(&key.symbol(), limit).await
    }
}
