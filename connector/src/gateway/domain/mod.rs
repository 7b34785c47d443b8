mod events;
mod exchange;
mod keys;
mod traits;

pub use events::{StreamData, WsEvent, WsRequest};
pub use exchange::ExchangeId;
pub use keys::{AssetClass, BookKey, Currency, UnknownAssetClass};
pub use traits::{BookStore, DepthFetcher, StreamParser};
