// =============================================================================
// Stream transport — one duplex text connection per `open()`
// =============================================================================
//
// The manager never touches the socket directly. Each `open()` yields a pair
// of channels: text frames to send, and events received. The reader side ends
// with exactly one `Closed` or `Error`, after which the handle is dead.
// =============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Closed,
    Error(String),
}

/// Live connection. Dropping `outbound` closes the write half.
#[derive(Debug)]
pub struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self) -> EngineResult<TransportHandle>;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self) -> EngineResult<TransportHandle> {
        info!(url = %self.url, "connecting to price stream");

        let (ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| EngineError::StreamTransport(format!("connect {} failed: {e}", self.url)))?;

        info!(url = %self.url, "price stream connected");
        let (mut write, mut read) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // Writer: forward outbound frames until every sender is gone.
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!(error = %e, "price stream write failed");
                    return;
                }
            }
            let _ = write.close().await;
            debug!("price stream writer closed");
        });

        // Reader: forward text frames, end with one terminal event.
        tokio::spawn(async move {
            loop {
                let event = match read.next().await {
                    Some(Ok(Message::Text(text))) => TransportEvent::Message(text),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "price stream close frame");
                        TransportEvent::Closed
                    }
                    // Ping/pong are answered by tungstenite; binary is unused.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => TransportEvent::Error(e.to_string()),
                    None => TransportEvent::Closed,
                };
                let terminal = !matches!(event, TransportEvent::Message(_));
                if in_tx.send(event).is_err() || terminal {
                    return;
                }
            }
        });

        Ok(TransportHandle {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
