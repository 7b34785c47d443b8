use market_core::DepthUpdateEvent;
use serde_json::Value;

use crate::gateway::domain::{StreamData, StreamParser};

/// Parses depth diff payloads into the depth variant of [`StreamData`].
pub struct DepthParser;

impl StreamParser for DepthParser {
    fn can_parse(&self, stream: &str) -> bool {
        stream.to_lowercase().contains("@depth")
    }

    fn parse(&self, _stream: &str, data: &Value) -> Option<StreamData> {
        let update: DepthUpdateEvent = serde_json::from_value(data.clone()).ok()?;
        Some(StreamData::DepthUpdate(update))
    }
}

/// Parses trade payloads. Trades carry no book state; the connector
/// only logs them.
pub struct TradeParser;

impl StreamParser for TradeParser {
    fn can_parse(&self, stream: &str) -> bool {
        stream.to_lowercase().contains("@trade")
    }

    fn parse(&self, _stream: &str, data: &Value) -> Option<StreamData> {
        Some(StreamData::Trade {
            symbol: data.get("s")?.as_str()?.to_string(),
            trade_id: data.get("t")?.as_u64()?,
            price: data.get("p")?.as_str()?.to_string(),
            quantity: data.get("q")?.as_str()?.to_string(),
            trade_time: data.get("T")?.as_i64()?,
            is_buyer_maker: data.get("m")?.as_bool()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_parser_stream_names() {
        let parser = DepthParser;
        assert!(parser.can_parse("btcusdt@depth"));
        assert!(parser.can_parse("ETHUSDT@depth@100ms"));
        assert!(!parser.can_parse("btcusdt@trade"));
    }

    #[test]
    fn test_depth_parser_decodes_diff() {
        let data = serde_json::json!({
            "e": "depthUpdate",
            "E": 1700000000000i64,
            "s": "BTCUSDT",
            "U": 100,
            "u": 105,
            "b": [["50000.00", "1.5"], ["49999.00", "2.0"]],
            "a": [["50001.00", "1.0"]]
        });

        let Some(StreamData::DepthUpdate(update)) = DepthParser.parse("btcusdt@depth", &data)
        else {
            panic!("expected DepthUpdate");
        };
        assert_eq!(update.symbol, "BTCUSDT");
        assert_eq!(update.first_update_id, 100);
        assert_eq!(update.final_update_id, 105);
        assert_eq!(update.bids.len(), 2);
        assert_eq!(update.asks.len(), 1);
    }

    #[test]
    fn test_depth_parser_rejects_malformed_payload() {
        let data = serde_json::json!({ "e": "depthUpdate", "s": "BTCUSDT" });
        assert!(DepthParser.parse("btcusdt@depth", &data).is_none());
    }

    #[test]
    fn test_trade_parser_decodes_trade() {
        let data = serde_json::json!({
            "e": "trade",
            "E": 1700000000000i64,
            "s": "BTCUSDT",
            "t": 12345,
            "p": "50000.00",
            "q": "1.5",
            "T": 1700000000001i64,
            "m": true
        });

        let parser = TradeParser;
        assert!(parser.can_parse("btcusdt@trade"));
        let Some(StreamData::Trade {
            symbol,
            trade_id,
            is_buyer_maker,
            ..
        }) = parser.parse("btcusdt@trade", &data)
        else {
            panic!("expected Trade");
        };
        assert_eq!(symbol, "BTCUSDT");
        assert_eq!(trade_id, 12345);
        assert!(is_buyer_maker);
    }
}
