use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use cuedeck_core::types::DbId;
use cuedeck_events::{HubFrame, NotificationHub};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::AppState;

/// The first (and only meaningful) client frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct Subscribe {
    #[serde(rename = "fileID")]
    pub file_id: DbId,
}

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let handshake_timeout = state.config.hub.handshake_timeout;
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub, handshake_timeout))
}

/// Manage a single WebSocket connection after upgrade.
///
///   1. Wait for the subscription frame; close the socket if it is late or
///      invalid.
///   2. Register the connection with the hub under the file id.
///   3. Spawn a sender task that turns hub frames into WebSocket frames.
///   4. Drain inbound frames until either side closes.
///   5. Drop the registration if it is still ours.
async fn handle_socket(socket: WebSocket, hub: Arc<NotificationHub>, handshake_timeout: Duration) {
    let conn_id = uuid::Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();

    let file_id = match tokio::time::timeout(handshake_timeout, read_subscription(&mut stream)).await
    {
        Ok(Some(file_id)) => file_id.to_string(),
        Ok(None) => {
            tracing::debug!(%conn_id, "Invalid subscription frame, closing");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
        Err(_) => {
            tracing::debug!(%conn_id, "No subscription frame before timeout, closing");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.register(file_id.clone(), conn_id, tx).await;
    tracing::info!(%conn_id, file_id = %file_id, "WebSocket subscribed");

    let sender_conn_id = conn_id;
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let (message, last) = match frame {
                HubFrame::Text(text) => (Message::Text(text.into()), false),
                HubFrame::Ping => (Message::Ping(Bytes::new()), false),
                HubFrame::Close => (Message::Close(None), true),
            };
            if sink.send(message).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if last {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(%conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    hub.unregister(&file_id, conn_id).await;
    send_task.abort();
    tracing::info!(%conn_id, file_id = %file_id, "WebSocket disconnected");
}

/// Read frames until the first data frame and parse it as a subscription.
///
/// Control frames before it are skipped. Returns `None` for anything other
/// than a well-formed subscription, or when the client goes away.
async fn read_subscription(stream: &mut SplitStream<WebSocket>) -> Option<DbId> {
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Text(text) => {
                return serde_json::from_str::<Subscribe>(text.as_str())
                    .ok()
                    .map(|s| s.file_id);
            }
            _ => return None,
        }
    }
    None
}
