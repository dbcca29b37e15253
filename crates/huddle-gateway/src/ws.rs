// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the conversation frame protocol.
//!
//! The client identifies itself in the upgrade query string:
//! `GET /ws?conversationId=conv-1&userId=alice`. After the upgrade the
//! connection speaks newline-free JSON frames (see
//! [`huddle_actor::protocol`]); the first server frame is `connected`.
//!
//! A malformed inbound frame gets an `error` frame on this connection only
//! and mutates nothing.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use huddle_actor::actor::ActorCommand;
use huddle_actor::protocol::{ServerFrame, error_codes, parse_client_frame};
use huddle_actor::registry::ConnectionHandle;
use huddle_core::types::{ConnectionId, ConversationId, SessionAttachment, UserId, now_rfc3339};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::server::GatewayState;

/// Identity carried in the upgrade query string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsParams {
    pub conversation_id: String,
    pub user_id: String,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, params, state))
}

/// Drive one WebSocket connection.
///
/// Spawns a sender task forwarding actor frames to the socket, attaches the
/// connection to its conversation's actor, then reads client frames until
/// the socket closes.
async fn handle_socket(socket: WebSocket, params: WsParams, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let conn_id = ConnectionId(uuid::Uuid::new_v4().to_string());
    let conversation_id = ConversationId(params.conversation_id);
    let user_id = UserId(params.user_id);

    let (handle, mut rx): (ConnectionHandle, _) = mpsc::unbounded_channel();

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "outbound frame serialization failed");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let attachment = SessionAttachment {
        user_id: user_id.clone(),
        conversation_id: conversation_id.clone(),
        connected_at: now_rfc3339(),
    };
    state
        .manager
        .attach(conn_id.clone(), attachment, handle.clone())
        .await;
    tracing::debug!(conversation = %conversation_id, user = %user_id, "connection attached");

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let frame = match parse_client_frame(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        let _ = handle.send(ServerFrame::error(
                            error_codes::MALFORMED_FRAME,
                            e.to_string(),
                        ));
                        continue;
                    }
                };
                if state
                    .manager
                    .dispatch(
                        &conversation_id,
                        ActorCommand::Frame {
                            conn_id: conn_id.clone(),
                            user_id: user_id.clone(),
                            frame,
                        },
                    )
                    .await
                    .is_err()
                {
                    let _ = handle.send(ServerFrame::error(
                        error_codes::UNAVAILABLE,
                        "conversation unavailable",
                    ));
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary; ping/pong handled by the ws layer.
        }
    }

    state.manager.detach(&conn_id).await;
    sender_task.abort();
    tracing::debug!(conversation = %conversation_id, user = %user_id, "connection detached");
}
