//! Operator WebSocket handler: one connection per operator client, every
//! inbound frame a tagged JSON message, every outbound frame a broadcast
//! of whatever the orchestrator emits.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::messages::{InboundMessage, OutboundMessage};
use crate::server::AppState;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    tracing::info!(%connection_id, "operator connected");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.orchestrator.subscribe();

    let forward_task = tokio::spawn(async move {
        while let Ok(event) = updates.recv().await {
            let msg = OutboundMessage::from(event);
            let Ok(json) = serde_json::to_string(&msg) else { continue };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<InboundMessage>(&text) {
                Ok(msg) => {
                    if let Err(e) = state.orchestrator.send(msg.into()) {
                        tracing::warn!(%connection_id, error = %e, "orchestrator channel closed, dropping inbound message");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(%connection_id, error = %e, raw = %text, "failed to parse inbound operator message");
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
    tracing::info!(%connection_id, "operator disconnected");
}
