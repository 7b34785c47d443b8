use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use url::Url;

use crate::gateway::domain::{WsEvent, WsRequest};

#[derive(Debug, Error)]
pub enum WsError {
    #[error("invalid websocket url: {0}")]
    Url(#[from] url::ParseError),
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("request channel closed")]
    ChannelClosed,
}

/// WebSocket client for streamed market data.
///
/// `connect` spawns a reader and a writer task; the caller gets a
/// request sender for subscriptions and a receiver of [`WsEvent`]s.
/// When the transport drops, the reader emits `Disconnected` and both
/// tasks wind down; reconnecting is the caller's responsibility.
pub struct WsClient {
    url: String,
}

impl WsClient {
    pub fn new(url: String) -> Self {
        WsClient { url }
    }

    pub async fn connect(&self) -> Result<(WsRequestSender, mpsc::Receiver<WsEvent>), WsError> {
        Url::parse(&self.url)?;

        let (stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = stream.split();

        let (event_tx, event_rx) = mpsc::channel::<WsEvent>(1024);
        let (request_tx, mut request_rx) = mpsc::channel::<WsRequest>(64);

        // Writer: serializes outbound requests and pongs.
        tokio::spawn(async move {
            let mut next_id: u64 = 1;
            while let Some(request) = request_rx.recv().await {
                let message = encode_request(request, &mut next_id);
                if write.send(message).await.is_err() {
                    break;
                }
            }
        });

        // Reader: decodes frames and forwards transport state changes.
        let pong_tx = request_tx.clone();
        tokio::spawn(async move {
            let _ = event_tx.send(WsEvent::Connected).await;
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = decode_frame(text.as_str()) {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Ping(payload)) => {
                        let _ = pong_tx.send(WsRequest::Pong(payload.to_vec())).await;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "websocket read error");
                        break;
                    }
                }
            }
            let _ = event_tx.send(WsEvent::Disconnected).await;
        });

        Ok((WsRequestSender(request_tx), event_rx))
    }
}

/// Encode one outbound request as a websocket message, numbering
/// subscription management frames.
fn encode_request(request: WsRequest, next_id: &mut u64) -> Message {
    match request {
        WsRequest::Subscribe { streams } => command_frame("SUBSCRIBE", &streams, next_id),
        WsRequest::Unsubscribe { streams } => command_frame("UNSUBSCRIBE", &streams, next_id),
        WsRequest::Pong(payload) => Message::Pong(Bytes::from(payload)),
    }
}

fn command_frame(method: &str, streams: &[String], next_id: &mut u64) -> Message {
    let frame = serde_json::json!({
        "method": method,
        "params": streams,
        "id": *next_id,
    });
    *next_id += 1;
    Message::text(frame.to_string())
}

/// Decode one text frame into a stream event.
///
/// Handles both the combined-stream envelope and raw per-stream
/// messages; subscription acks and unknown event tags are dropped.
fn decode_frame(text: &str) -> Option<WsEvent> {
    let value: Value = serde_json::from_str(text).ok()?;

    if let (Some(stream), Some(data)) = (
        value.get("stream").and_then(Value::as_str),
        value.get("data"),
    ) {
        return Some(WsEvent::Stream {
            stream: stream.to_string(),
            data: data.clone(),
        });
    }

    let kind = value.get("e").and_then(Value::as_str)?;
    let symbol = value.get("s").and_then(Value::as_str)?.to_lowercase();
    let stream = match kind {
        "depthUpdate" => format!("{symbol}@depth"),
        "trade" => format!("{symbol}@trade"),
        _ => return None,
    };
    Some(WsEvent::Stream {
        stream,
        data: value,
    })
}

/// Handle for sending requests over an established connection.
#[derive(Clone)]
pub struct WsRequestSender(mpsc::Sender<WsRequest>);

impl WsRequestSender {
    pub async fn subscribe(&self, streams: Vec<String>) -> Result<(), WsError> {
        self.0
            .send(WsRequest::Subscribe { streams })
            .await
            .map_err(|_| WsError::ChannelClosed)
    }

    pub async fn unsubscribe(&self, streams: Vec<String>) -> Result<(), WsError> {
        self.0
            .send(WsRequest::Unsubscribe { streams })
            .await
            .map_err(|_| WsError::ChannelClosed)
    }
}
