use market_core::DepthUpdateEvent;
use serde_json::Value;

/// Parsed payload of one websocket stream message.
///
/// Closed set of known event kinds, decoded once by the stream parsers;
/// anything the parsers do not recognize never reaches the application
/// layer.
#[derive(Debug, Clone)]
pub enum StreamData {
    DepthUpdate(DepthUpdateEvent),
    Trade {
        symbol: String,
        trade_id: u64,
        price: String,
        quantity: String,
        trade_time: i64,
        is_buyer_maker: bool,
    },
}

impl StreamData {
    pub fn symbol(&self) -> &str {
        match self {
            StreamData::DepthUpdate(update) => &update.symbol,
            StreamData::Trade { symbol, .. } => symbol,
        }
    }
}

/// Transport-level event delivered by the websocket client.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// A raw stream message: stream name plus undecoded payload.
    Stream { stream: String, data: Value },
    Connected,
    Disconnected,
}

/// Outbound websocket request, written by the client's writer task.
#[derive(Debug, Clone)]
pub enum WsRequest {
    Subscribe { streams: Vec<String> },
    Unsubscribe { streams: Vec<String> },
    Pong(Vec<u8>),
}
