// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire protocol for the conversation channel.
//!
//! Newline-free JSON objects, one per frame, with a `type` discriminant.
//! Client -> Server (JSON):
//! ```json
//! {"type": "send_message", "content": "hi", "kind": "text", "clientId": "c1"}
//! {"type": "mark_read", "messageId": "...", "userId": "bob"}
//! {"type": "get_history", "limit": 50}
//! {"type": "typing", "isTyping": true}
//! ```
//! Server -> Client frames are enumerated in [`ServerFrame`].

use huddle_core::HuddleError;
use huddle_core::types::{Message, MessageId, MessageKind, MessageStatus, UserId};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Error codes carried by [`ServerFrame::Error`].
pub mod error_codes {
    /// Frame could not be parsed or had an unknown `type`.
    pub const MALFORMED_FRAME: &str = "malformed_frame";
    /// Referenced message does not exist in this conversation.
    pub const UNKNOWN_MESSAGE: &str = "unknown_message";
    /// The operation failed inside the server.
    pub const INTERNAL: &str = "internal";
    /// The conversation actor could not be reached.
    pub const UNAVAILABLE: &str = "unavailable";
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

/// Client -> server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    SendMessage {
        content: String,
        /// Wire name `kind`: the frame's `type` key is the discriminant.
        #[serde(default = "default_kind")]
        kind: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_size: Option<i64>,
        /// Client-supplied correlation ID, echoed back in the `sent` ack.
        /// Distinct from the server-assigned message ID.
        client_id: String,
    },
    MarkRead {
        message_id: MessageId,
        user_id: UserId,
    },
    GetHistory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<MessageId>,
    },
    Typing {
        is_typing: bool,
    },
}

/// Presence of a user within one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Server -> client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// First frame after a successful attach.
    Connected { online_user_ids: Vec<UserId> },
    PresenceUpdate {
        user_id: UserId,
        status: PresenceStatus,
    },
    NewMessage { message: Message },
    /// Status transition notice. Keyed by `client_id` for the initial `sent`
    /// ack, by `message_id` afterwards.
    MessageStatus {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<MessageId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        status: MessageStatus,
        server_timestamp: String,
    },
    MessageRead {
        message_id: MessageId,
        user_id: UserId,
        read_at: String,
    },
    HistoryResponse {
        messages: Vec<Message>,
        has_more: bool,
    },
    Typing { user_id: UserId, is_typing: bool },
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl ServerFrame {
    /// Build an error frame with no details payload.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Parse one client frame from its JSON text.
///
/// A parse failure is a malformed-input error: the caller responds with an
/// `error` frame on the originating connection only and mutates nothing.
pub fn parse_client_frame(text: &str) -> Result<ClientFrame, HuddleError> {
    serde_json::from_str(text).map_err(|e| HuddleError::Protocol {
        message: format!("invalid frame: {e}"),
    })
}
