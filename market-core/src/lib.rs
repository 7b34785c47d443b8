//! Shared market-data domain types.
//!
//! Wire-level depth events (Binance-style field names) plus the value
//! objects used by order book queries. Kept free of any transport or
//! engine logic so both the connector and its tests depend on one
//! vocabulary.

pub mod events;
pub mod value_objects;

pub use events::{DepthSnapshotEvent, DepthUpdateEvent};
pub use value_objects::{Price, PriceLevel, Quantity};
