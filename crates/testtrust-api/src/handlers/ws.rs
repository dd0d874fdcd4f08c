//! WebSocket upgrade handler.
//!
//! Every socket is one transport session. Student clients and instructor
//! dashboards share this endpoint and identify themselves with their first
//! event.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if !state.realtime.connections.is_accepting() {
        return Err(testtrust_core::error::AppError::transport_unavailable(
            "Server is shutting down",
        )
        .into());
    }
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, socket: WebSocket) {
    let (handle, mut outbound_rx) = match state.realtime.connections.register() {
        Ok(registered) => registered,
        Err(e) => {
            warn!(error = %e, "Rejecting WebSocket connection");
            return;
        }
    };
    let conn_id = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    info!(conn_id = %conn_id, "WebSocket connection established");

    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!(conn_id = %conn_id, error = %e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.realtime.handle_inbound(&conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Pong(_))) => handle.touch().await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    outbound_task.abort();
    state.realtime.handle_disconnect(&conn_id).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
