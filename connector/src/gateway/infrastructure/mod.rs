mod parsers;
mod rest_client;
mod ws_client;

pub use parsers::{DepthParser, TradeParser};
pub use rest_client::{RestClient, RestError};
pub use ws_client::{WsClient, WsError, WsRequestSender};
