use super::state::AppState;
use crate::protocol::outbound_channel;
use anyhow::anyhow;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use futures::{future, SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

/// Largest single audio message accepted from a client (4 MB)
const MAX_AUDIO_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
}

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            active_sessions: state.active_session_count(),
        }),
    )
}

/// GET /ws
/// Upgrade to a live audio session: binary audio in, JSON messages out
pub async fn session_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(MAX_AUDIO_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_session_socket(socket, state))
}

async fn handle_session_socket(socket: WebSocket, state: AppState) {
    info!("WebSocket connected");

    let (mut sender, receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = outbound_channel();

    // Sole owner of the socket's write half; everything else submits through the channel
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json)).await {
                debug!("Failed to send {} message: {}", message.kind(), e);
                break;
            }
        }

        let _ = sender.close().await;
    });

    let inbound = receiver.filter_map(|message| {
        future::ready(match message {
            Ok(Message::Binary(data)) => Some(Ok(Bytes::from(data))),
            Ok(Message::Text(_)) => Some(Err(anyhow!("Unexpected text frame from client"))),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Close(_)) => None,
            Err(e) => Some(Err(anyhow!(e))),
        })
    });

    let active = state.track_session();

    match state.sessions.run(inbound, outbound_tx).await {
        Ok(stats) => info!(
            session_id = %stats.session_id,
            "WebSocket session finished ({})",
            stats.state
        ),
        Err(e) => error!("WebSocket session aborted: {:#}", e),
    }

    drop(active);

    // The writer drains translations still in flight, then closes the socket
    drop(writer);
}
