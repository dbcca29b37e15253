// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push escalation: the fallback notification path for participants with no
//! live connection.
//!
//! The audience is `participants - excluded user - currently online users`.
//! Gateway calls run with bounded parallel batching; partial failures are
//! logged and swallowed. A push failure must never fail the originating
//! message or read-receipt operation.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use huddle_core::types::{Message, MessageKind, UserId};
use huddle_core::{HuddleError, ProfileStore, PushGateway};
use tracing::{debug, warn};

/// Escalates undeliverable events to the external push gateway.
pub struct PushEscalator {
    profiles: Arc<dyn ProfileStore>,
    gateway: Arc<dyn PushGateway>,
    enabled: bool,
    batch_size: usize,
}

impl PushEscalator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        gateway: Arc<dyn PushGateway>,
        enabled: bool,
        batch_size: usize,
    ) -> Self {
        Self {
            profiles,
            gateway,
            enabled,
            batch_size: batch_size.max(1),
        }
    }

    /// Notify every offline participant (except the sender) of a new message
    /// with a loud push.
    pub async fn notify_offline(&self, message: &Message, online: &[UserId]) {
        if !self.enabled {
            return;
        }
        let audience = match self.audience(message, &message.sender_id, online).await {
            Ok(audience) => audience,
            Err(e) => {
                warn!(error = %e, "push escalation skipped: participant lookup failed");
                return;
            }
        };
        if audience.is_empty() {
            return;
        }

        let title = self.sender_title(&message.sender_id).await;
        let body = preview_body(message);
        let data = serde_json::json!({
            "type": "new_message",
            "conversationId": message.conversation_id.0,
            "messageId": message.id.0,
            "senderId": message.sender_id.0,
        });

        self.deliver(audience, title, body, data).await;
    }

    /// Notify the original sender that their message was read, with a
    /// silent push, when the sender has no live connection.
    pub async fn notify_read_receipt(
        &self,
        message: &Message,
        reader_id: &UserId,
        read_at: &str,
        online: &[UserId],
    ) {
        if !self.enabled || online.contains(&message.sender_id) {
            return;
        }
        let data = serde_json::json!({
            "type": "read_receipt",
            "conversationId": message.conversation_id.0,
            "messageId": message.id.0,
            "readerId": reader_id.0,
            "readAt": read_at,
        });
        // Silent payload: empty title/body, data-only.
        self.deliver(vec![message.sender_id.clone()], String::new(), String::new(), data)
            .await;
    }

    async fn audience(
        &self,
        message: &Message,
        excluded: &UserId,
        online: &[UserId],
    ) -> Result<Vec<UserId>, HuddleError> {
        let participants = self
            .profiles
            .get_participants(&message.conversation_id)
            .await?;
        Ok(participants
            .into_iter()
            .filter(|user| user != excluded && !online.contains(user))
            .collect())
    }

    async fn sender_title(&self, sender_id: &UserId) -> String {
        match self.profiles.get_display_name(sender_id).await {
            Ok(Some(name)) => name,
            Ok(None) => sender_id.0.clone(),
            Err(e) => {
                debug!(error = %e, "display name lookup failed, using raw id");
                sender_id.0.clone()
            }
        }
    }

    /// Fan pushes out with bounded concurrency. Each recipient is
    /// independent: token lookup or gateway failures are logged per user and
    /// never abort the batch.
    async fn deliver(
        &self,
        audience: Vec<UserId>,
        title: String,
        body: String,
        data: serde_json::Value,
    ) {
        stream::iter(audience)
            .map(|user| {
                let title = title.clone();
                let body = body.clone();
                let data = data.clone();
                async move {
                    let tokens = match self.profiles.get_push_tokens(&user).await {
                        Ok(tokens) => tokens,
                        Err(e) => {
                            warn!(user = %user, error = %e, "push token lookup failed");
                            return;
                        }
                    };
                    if tokens.is_empty() {
                        debug!(user = %user, "no push tokens registered, skipping");
                        return;
                    }
                    if let Err(e) = self.gateway.send(&tokens, &title, &body, data).await {
                        warn!(user = %user, error = %e, "push gateway send failed");
                    }
                }
            })
            .buffer_unordered(self.batch_size)
            .collect::<Vec<()>>()
            .await;
    }
}

fn preview_body(message: &Message) -> String {
    match message.kind {
        MessageKind::Text => {
            let mut body = message.content.clone();
            if body.chars().count() > 120 {
                body = body.chars().take(119).collect::<String>() + "…";
            }
            body
        }
        MessageKind::Image => "Sent an image".to_string(),
        MessageKind::File => "Sent a file".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::types::{ConversationId, MessageId, MessageStatus};

    fn make_msg(kind: MessageKind, content: &str) -> Message {
        Message {
            id: MessageId("m1".into()),
            conversation_id: ConversationId("conv-1".into()),
            sender_id: UserId("alice".into()),
            content: content.to_string(),
            kind,
            status: MessageStatus::Sent,
            media_url: None,
            media_type: None,
            media_size: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(400);
        let body = preview_body(&make_msg(MessageKind::Text, &long));
        assert_eq!(body.chars().count(), 120);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn preview_describes_media_kinds() {
        assert_eq!(preview_body(&make_msg(MessageKind::Image, "")), "Sent an image");
        assert_eq!(preview_body(&make_msg(MessageKind::File, "")), "Sent a file");
    }
}
