//! WebSocket upgrade handler
//!
//! Each connection gets a fresh id and an unbounded outbound queue; the
//! room server pushes broadcasts into the queue and a writer task drains
//! it into the socket, so one slow client never blocks a room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn = %conn_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Register with the room server; it answers with WELCOME on out_rx.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMsg>();
    state.rooms.connect(conn_id, out_tx);

    // Writer task: room server broadcasts -> WebSocket.
    let writer_conn_id = conn_id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!(conn = %writer_conn_id, error = %e, "Failed to encode message");
                    continue;
                }
            };
            if let Err(e) = ws_sink.send(Message::Text(json)).await {
                debug!(conn = %writer_conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> room server.
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => state.rooms.inbound(conn_id, msg),
                Err(e) => {
                    // Malformed frames are dropped, never fatal.
                    warn!(conn = %conn_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(conn = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(conn = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Leave-room side effects run inside the room server loop.
    state.rooms.disconnect(conn_id);
    writer_handle.abort();

    info!(conn = %conn_id, "WebSocket connection closed");
}
