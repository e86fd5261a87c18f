//! Session transports.
//!
//! The controller talks to a room authority through [`SessionTransport`]:
//! outbound client messages go through `send`, inbound server messages
//! and the close notification arrive on an event channel. The production
//! backend is [`WsTransport`]; `local_relay` provides the same surface
//! without a network.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Inbound side of a transport.
#[derive(Debug)]
pub enum TransportEvent {
    Message(ServerMsg),
    /// Emitted exactly once, after which no further events arrive.
    Closed { reason: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),
    #[error("Transport closed")]
    Closed,
}

/// Outbound side of a transport. Send is fire-and-forget: delivery
/// failures surface as a `Closed` event, not as send errors.
pub trait SessionTransport: Send + Sync {
    fn send(&self, msg: ClientMsg) -> Result<(), TransportError>;
    fn close(&self);
}

/// WebSocket transport to a room server.
pub struct WsTransport {
    out_tx: mpsc::UnboundedSender<ClientMsg>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl WsTransport {
    /// Connect to `url` (e.g. `ws://127.0.0.1:8080/ws`) and spawn the
    /// reader/writer tasks. Returns the transport and its event stream.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMsg>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode outbound message");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(WsMessage::Text(text))) => match serde_json::from_str(&text) {
                        Ok(msg) => {
                            if event_tx.send(TransportEvent::Message(msg)).is_err() {
                                break "receiver dropped".to_string();
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, raw = %text, "Unparseable server message");
                        }
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string());
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are handled by the library; ignore
                        // binary frames on a text protocol.
                    }
                    Some(Err(e)) => break e.to_string(),
                    None => break "connection ended".to_string(),
                }
            };
            debug!(%reason, "Transport reader finished");
            let _ = event_tx.send(TransportEvent::Closed { reason });
        });

        Ok((
            Self {
                out_tx,
                writer,
                reader,
            },
            event_rx,
        ))
    }
}

impl SessionTransport for WsTransport {
    fn send(&self, msg: ClientMsg) -> Result<(), TransportError> {
        self.out_tx.send(msg).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.writer.abort();
        self.reader.abort();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[tokio::test]
    async fn round_trips_messages_and_reports_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            // Expect one client message, answer with one server message.
            let inbound = ws.next().await.unwrap().unwrap();
            let parsed: ClientMsg = serde_json::from_str(inbound.to_text().unwrap()).unwrap();
            assert!(matches!(parsed, ClientMsg::QuickPlay { .. }));

            let reply = serde_json::to_string(&ServerMsg::CountdownStart { count: 10 }).unwrap();
            ws.send(WsMessage::Text(reply)).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let url = format!("ws://{addr}");
        let (transport, mut events) = WsTransport::connect(&url).await.unwrap();
        transport
            .send(ClientMsg::QuickPlay {
                player_name: "Ann".to_string(),
            })
            .unwrap();

        match events.recv().await.unwrap() {
            TransportEvent::Message(ServerMsg::CountdownStart { count }) => assert_eq!(count, 10),
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.unwrap() {
            TransportEvent::Closed { .. } => {}
            other => panic!("expected close, got: {other:?}"),
        }
        assert!(events.recv().await.is_none());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_to_nowhere_fails() {
        let err = WsTransport::connect("ws://127.0.0.1:1/ws").await.err();
        assert!(matches!(err, Some(TransportError::Connect(_))));
    }
}
