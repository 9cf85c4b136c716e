//! Chat WebSocket handler.
//!
//! One socket is one connection to one room. A writer task drains the
//! connection's outbound channel to the socket while the reader loop feeds
//! inbound text to the chat service. Whichever side ends first cancels the
//! other, then the connection leaves the room.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::chat::{Identity, Session};
use crate::web::error::ApiError;
use crate::web::handlers::rooms::find_room;
use crate::web::middleware::SessionUser;
use crate::web::state::AppState;

use super::messages::{event_frame, parse_frame};

/// WebSocket chat handler.
///
/// GET /ws/rooms/:id
pub async fn chat_ws_handler(
    State(state): State<Arc<AppState>>,
    SessionUser(session): SessionUser,
    Path(room_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let room = find_room(&state, &room_id).await?;
    let identity = session.identity();

    tracing::info!(
        room_id = %room.id,
        username = %identity.username,
        "WebSocket connection accepted"
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room.id, identity)))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room_id: String, identity: Identity) {
    let chat = state.chat.clone();

    let Session { id, mut events } = match chat.connect(&room_id, identity.clone()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(room_id = %room_id, error = %e, "Failed to join room");
            return;
        }
    };
    tracing::debug!(room_id = %room_id, connection_id = %id, "WebSocket session started");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let cancel = CancellationToken::new();

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_cancel.cancelled() => break,
                event = events.recv() => {
                    // Channel closed: the hub evicted this connection.
                    let Some(event) = event else { break };
                    let frame = match event_frame(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to encode event");
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        writer_cancel.cancel();
        let _ = ws_sender.close().await;
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let content = parse_frame(&text);
                    chat.submit_client_text(&room_id, &identity, &content).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(connection_id = %id, "WebSocket closed by client");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    cancel.cancel();
    let _ = writer.await;

    chat.disconnect(&room_id, id).await;
    tracing::debug!(room_id = %room_id, connection_id = %id, "WebSocket session ended");
}
