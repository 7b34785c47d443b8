use connector::gateway::{ExchangeManager, load_config};
use connector::order_book::OrderBookManager;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("connector=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "connector.json".to_string());
    tracing::info!(%config_path, "starting order book connector");
    let config = load_config(&config_path)?;

    let books = OrderBookManager::new();
    let mut manager = ExchangeManager::new(config, books);
    manager.initialize();
    let senders = manager.start_all().await;
    tracing::info!(exchanges = senders.len(), "connector running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    manager.shutdown();

    Ok(())
}
