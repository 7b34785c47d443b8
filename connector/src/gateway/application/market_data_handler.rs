use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::gateway::config::PairConfig;
use crate::gateway::domain::{
    BookKey, BookStore, DepthFetcher, ExchangeId, StreamData, StreamParser, WsEvent,
};
use crate::gateway::infrastructure::{DepthParser, TradeParser};

use super::sync::BookSynchronizer;

/// Per-exchange market data pump.
///
/// Demultiplexes transport events through the stream parsers and routes
/// depth diffs into the synchronization engine. Trades carry no book
/// state and are only logged here.
pub struct MarketDataHandler<B, F> {
    exchange_id: ExchangeId,
    sync: Arc<BookSynchronizer<B, F>>,
    parsers: Vec<Box<dyn StreamParser>>,
    keys_by_symbol: HashMap<String, BookKey>,
}

impl<B, F> MarketDataHandler<B, F>
where
    B: BookStore + 'static,
    F: DepthFetcher + 'static,
{
    pub fn new(
        exchange_id: ExchangeId,
        sync: Arc<BookSynchronizer<B, F>>,
        pairs: &[PairConfig],
    ) -> Self {
        let keys_by_symbol = pairs
            .iter()
            .map(|pair| {
                let key = pair.book_key();
                (key.symbol(), key)
            })
            .collect();

        MarketDataHandler {
            exchange_id,
            sync,
            parsers: vec![Box::new(DepthParser), Box::new(TradeParser)],
            keys_by_symbol,
        }
    }

    /// Spawn the event loop; feed it through the returned sender.
    pub fn start(self: Arc<Self>) -> mpsc::Sender<WsEvent> {
        let (tx, mut rx) = mpsc::channel::<WsEvent>(1024);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle_event(event);
            }
            tracing::debug!(exchange = %self.exchange_id, "market data handler stopped");
        });

        tx
    }

    fn handle_event(&self, event: WsEvent) {
        match event {
            WsEvent::Stream { stream, data } => self.handle_stream(&stream, &data),
            WsEvent::Connected => {
                tracing::info!(exchange = %self.exchange_id, "websocket connected");
            }
            WsEvent::Disconnected => {
                // The diff stream restarted; nothing received before the
                // reconnect can be trusted. Resync every book.
                tracing::warn!(exchange = %self.exchange_id, "websocket disconnected, resyncing all books");
                for key in self.keys_by_symbol.values() {
                    self.sync.cleanup(key);
                }
            }
        }
    }

    fn handle_stream(&self, stream: &str, data: &serde_json::Value) {
        let parsed = self
            .parsers
            .iter()
            .find(|p| p.can_parse(stream))
            .and_then(|p| p.parse(stream, data));

        let Some(parsed) = parsed else {
            tracing::trace!(exchange = %self.exchange_id, stream, "unhandled stream message");
            return;
        };

        match parsed {
            StreamData::DepthUpdate(update) => {
                let Some(key) = self.keys_by_symbol.get(&update.symbol.to_uppercase()) else {
                    tracing::trace!(exchange = %self.exchange_id, symbol = %update.symbol, "diff for unsubscribed symbol");
                    return;
                };
                // Failures are logged and recovered inside the engine.
                let _ = self.sync.process(key, update);
            }
            StreamData::Trade {
                symbol,
                price,
                quantity,
                ..
            } => {
                tracing::trace!(exchange = %self.exchange_id, %symbol, %price, %quantity, "trade");
            }
        }
    }

    pub fn exchange_id(&self) -> &ExchangeId {
        &self.exchange_id
    }

    /// Keys this handler routes diffs for.
    pub fn keys(&self) -> impl Iterator<Item = &BookKey> {
        self.keys_by_symbol.values()
    }
}
