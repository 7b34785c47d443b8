use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::PriceLevel;

/// Incremental depth diff covering the update range
/// `first_update_id..=final_update_id` (Binance-style field names).
///
/// Levels are carried in wire form as `[price, quantity]` string pairs;
/// a zero quantity removes the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthUpdateEvent {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "U")]
    pub first_update_id: u64,
    #[serde(rename = "u")]
    pub final_update_id: u64,
    #[serde(rename = "b")]
    pub bids: Vec<[String; 2]>,
    #[serde(rename = "a")]
    pub asks: Vec<[String; 2]>,
}

impl DepthUpdateEvent {
    pub fn from_levels(
        symbol: impl Into<String>,
        first_update_id: u64,
        final_update_id: u64,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
        event_time: i64,
    ) -> Self {
        DepthUpdateEvent {
            symbol: symbol.into(),
            event_time,
            first_update_id,
            final_update_id,
            bids: render_levels(bids),
            asks: render_levels(asks),
        }
    }

    /// Event timestamp in milliseconds since the epoch, as wall time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.event_time).single()
    }

    /// Whether this diff is already covered by a book at `last_update_id`.
    pub fn is_stale(&self, last_update_id: u64) -> bool {
        self.final_update_id <= last_update_id
    }

    /// Whether this diff bridges a snapshot taken at `last_update_id`,
    /// i.e. its range contains the next expected sequence number.
    pub fn bridges(&self, last_update_id: u64) -> bool {
        self.first_update_id <= last_update_id + 1 && last_update_id + 1 <= self.final_update_id
    }
}

/// Full point-in-time book for one symbol, with the sequence number it
/// corresponds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshotEvent {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

impl DepthSnapshotEvent {
    pub fn from_levels(last_update_id: u64, bids: &[PriceLevel], asks: &[PriceLevel]) -> Self {
        DepthSnapshotEvent {
            last_update_id,
            bids: render_levels(bids),
            asks: render_levels(asks),
        }
    }
}

fn render_levels(levels: &[PriceLevel]) -> Vec<[String; 2]> {
    levels
        .iter()
        .map(|l| [l.price.to_string(), l.quantity.to_string()])
        .collect()
}
