use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::gateway::config::{ConnectorConfigFile, ExchangeConfig};
use crate::gateway::domain::{ExchangeId, WsEvent};
use crate::gateway::infrastructure::{RestClient, WsClient};
use crate::order_book::{ExchangeBooks, OrderBookManager};

use super::market_data_handler::MarketDataHandler;
use super::sync::BookSynchronizer;

type ExchangeSynchronizer = BookSynchronizer<ExchangeBooks, RestClient>;

/// Wires up one synchronization engine, handler, and transport per
/// enabled exchange in the configuration.
pub struct ExchangeManager {
    config: ConnectorConfigFile,
    books: OrderBookManager,
    connections: HashMap<ExchangeId, ExchangeConnection>,
}

struct ExchangeConnection {
    config: ExchangeConfig,
    sync: Arc<ExchangeSynchronizer>,
    event_sender: Option<mpsc::Sender<WsEvent>>,
}

impl ExchangeManager {
    pub fn new(config: ConnectorConfigFile, books: OrderBookManager) -> Self {
        ExchangeManager {
            config,
            books,
            connections: HashMap::new(),
        }
    }

    /// Build engines and REST clients for all enabled exchanges.
    pub fn initialize(&mut self) {
        for exchange_config in self.config.enabled_exchanges().into_iter().cloned() {
            let exchange_id = ExchangeId::new(&exchange_config.id);

            let rest_client = RestClient::new(
                exchange_config.rest_url.clone(),
                exchange_config.api_key.clone(),
            );
            let sync = BookSynchronizer::new(
                exchange_config.sync.to_sync_config(exchange_id.clone()),
                self.books.scoped(exchange_id.clone()),
                rest_client,
            );

            self.connections.insert(
                exchange_id,
                ExchangeConnection {
                    config: exchange_config,
                    sync,
                    event_sender: None,
                },
            );
        }
    }

    /// Start workers, handlers, and websocket pumps for every
    /// initialized exchange.
    pub async fn start_all(&mut self) -> HashMap<ExchangeId, mpsc::Sender<WsEvent>> {
        let ids: Vec<ExchangeId> = self.connections.keys().cloned().collect();
        let mut senders = HashMap::new();

        for exchange_id in ids {
            if let Some(sender) = self.start_exchange(&exchange_id) {
                senders.insert(exchange_id, sender);
            }
        }

        senders
    }

    fn start_exchange(&mut self, exchange_id: &ExchangeId) -> Option<mpsc::Sender<WsEvent>> {
        let connection = self.connections.get_mut(exchange_id)?;

        connection.sync.start();

        let handler = Arc::new(MarketDataHandler::new(
            exchange_id.clone(),
            Arc::clone(&connection.sync),
            &connection.config.pairs,
        ));
        let event_sender = handler.start();
        connection.event_sender = Some(event_sender.clone());

        spawn_ws_pump(
            exchange_id.clone(),
            connection.config.clone(),
            self.config.global.clone(),
            event_sender.clone(),
        );

        Some(event_sender)
    }

    /// Signal every engine's worker pool to stop.
    pub fn shutdown(&self) {
        for connection in self.connections.values() {
            connection.sync.shutdown();
        }
    }

    /// Get the synchronizer driving a specific exchange.
    pub fn synchronizer(&self, exchange_id: &ExchangeId) -> Option<&Arc<ExchangeSynchronizer>> {
        self.connections.get(exchange_id).map(|c| &c.sync)
    }

    /// Get list of exchanges with a running event pump.
    pub fn connected_exchanges(&self) -> Vec<ExchangeId> {
        self.connections
            .iter()
            .filter(|(_, c)| c.event_sender.is_some())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn books(&self) -> &OrderBookManager {
        &self.books
    }

    pub fn config(&self) -> &ConnectorConfigFile {
        &self.config
    }
}

/// Connect, subscribe, and forward transport events to the handler,
/// reconnecting with a delay until the attempt budget is spent or the
/// handler goes away.
fn spawn_ws_pump(
    exchange_id: ExchangeId,
    exchange_config: ExchangeConfig,
    global: crate::gateway::config::GlobalConfig,
    events: mpsc::Sender<WsEvent>,
) {
    let ws_client = WsClient::new(exchange_config.ws_url.clone());
    let streams: Vec<String> = exchange_config
        .pairs
        .iter()
        .map(|pair| pair.depth_stream())
        .collect();

    tokio::spawn(async move {
        let mut attempts: u32 = 0;
        loop {
            match ws_client.connect().await {
                Ok((request_sender, mut event_rx)) => {
                    attempts = 0;
                    if let Err(err) = request_sender.subscribe(streams.clone()).await {
                        tracing::warn!(exchange = %exchange_id, error = %err, "subscribe failed");
                    }
                    while let Some(event) = event_rx.recv().await {
                        if events.send(event).await.is_err() {
                            tracing::warn!(exchange = %exchange_id, "handler closed, stopping pump");
                            return;
                        }
                    }
                    // Receiver drained: the transport dropped; the
                    // handler already saw Disconnected.
                }
                Err(err) => {
                    tracing::warn!(exchange = %exchange_id, error = %err, "websocket connect failed");
                }
            }

            attempts += 1;
            if attempts > global.max_reconnect_attempts {
                tracing::error!(exchange = %exchange_id, attempts, "reconnect budget exhausted");
                return;
            }
            tokio::time::sleep(global.reconnect_delay()).await;
        }
    });
}
