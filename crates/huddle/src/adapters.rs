// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Standalone collaborator adapters.
//!
//! Production deployments back [`ProfileStore`], [`AiCapability`], and
//! [`PushGateway`] with external services. These adapters keep a single-node
//! deployment functional without them: participants are inferred from the
//! message log, last-read state lives in process memory, pushes are logged,
//! and agent features report themselves unconfigured.

use std::collections::HashMap;

use async_trait::async_trait;
use huddle_actor::actor::AGENT_USER_ID;
use huddle_core::HuddleError;
use huddle_core::traits::ai::{AiCapability, CompletionOptions, VectorItem, VectorMatch};
use huddle_core::traits::profile::ProfileStore;
use huddle_core::traits::push::PushGateway;
use huddle_core::types::{ConversationId, UserId};
use huddle_storage::Database;
use huddle_storage::database::map_tr_err;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Profile store for single-node deployments with no external profile
/// service.
///
/// Participants are the distinct senders seen in the conversation's message
/// log. Last-read timestamps are process-local: they reset on restart, which
/// only delays read reconciliation until clients mark messages read again.
pub struct StandaloneProfileStore {
    db: Database,
    last_read: Mutex<HashMap<ConversationId, HashMap<UserId, String>>>,
}

impl StandaloneProfileStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            last_read: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ProfileStore for StandaloneProfileStore {
    async fn get_participants(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, HuddleError> {
        let conversation_id = conversation_id.0.clone();
        self.db
            .connection()
            .call(move |conn| {
                // The agent's plan messages must not make it a participant.
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT sender_id FROM messages
                     WHERE conversation_id = ?1 AND sender_id <> ?2",
                )?;
                let rows = stmt.query_map([conversation_id, AGENT_USER_ID.to_string()], |row| {
                    row.get::<_, String>(0).map(UserId)
                })?;
                let mut users = Vec::new();
                for row in rows {
                    users.push(row?);
                }
                Ok(users)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_display_name(&self, _user_id: &UserId) -> Result<Option<String>, HuddleError> {
        Ok(None)
    }

    async fn get_push_tokens(&self, _user_id: &UserId) -> Result<Vec<String>, HuddleError> {
        Ok(Vec::new())
    }

    async fn get_last_read_timestamps(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<HashMap<UserId, String>, HuddleError> {
        Ok(self
            .last_read
            .lock()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_last_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        timestamp: &str,
    ) -> Result<(), HuddleError> {
        self.last_read
            .lock()
            .await
            .entry(conversation_id.clone())
            .or_default()
            .insert(user_id.clone(), timestamp.to_string());
        Ok(())
    }

    async fn set_conversation_preview(
        &self,
        conversation_id: &ConversationId,
        timestamp: &str,
        _content: &str,
        sender_id: &UserId,
    ) -> Result<(), HuddleError> {
        debug!(conversation = %conversation_id, sender = %sender_id, %timestamp,
            "conversation preview update (no external profile service)");
        Ok(())
    }
}

/// AI capability placeholder for deployments without a configured provider.
///
/// Every call fails with a configuration error, which the actor and planner
/// surface as degraded mode: chat works fully, agent runs fail cleanly.
pub struct UnconfiguredAi;

impl UnconfiguredAi {
    fn unavailable() -> HuddleError {
        HuddleError::ai("no AI provider configured")
    }
}

#[async_trait]
impl AiCapability for UnconfiguredAi {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _options: CompletionOptions,
    ) -> Result<String, HuddleError> {
        Err(Self::unavailable())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, HuddleError> {
        Err(Self::unavailable())
    }

    async fn vector_upsert(&self, _items: Vec<VectorItem>) -> Result<(), HuddleError> {
        Err(Self::unavailable())
    }

    async fn vector_query(
        &self,
        _vector: Vec<f32>,
        _top_k: usize,
    ) -> Result<Vec<VectorMatch>, HuddleError> {
        Err(Self::unavailable())
    }
}

/// Push gateway that logs deliveries instead of sending them.
pub struct LoggingPush;

#[async_trait]
impl PushGateway for LoggingPush {
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        _body: &str,
        data: serde_json::Value,
    ) -> Result<(), HuddleError> {
        info!(
            recipients = tokens.len(),
            %title,
            kind = data.get("type").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "push delivery (no external gateway configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::id::new_message_id;
    use huddle_core::types::{Message, MessageKind, MessageStatus, now_rfc3339};
    use huddle_storage::queries::messages;

    fn text_message(conversation: &str, sender: &str) -> Message {
        let now = now_rfc3339();
        Message {
            id: new_message_id(),
            conversation_id: ConversationId(conversation.into()),
            sender_id: UserId(sender.into()),
            content: "hi".into(),
            kind: MessageKind::Text,
            status: MessageStatus::Sent,
            media_url: None,
            media_type: None,
            media_size: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn participants_are_distinct_senders() {
        let db = Database::open_in_memory().await.unwrap();
        messages::insert_message(&db, &text_message("conv-1", "alice"))
            .await
            .unwrap();
        messages::insert_message(&db, &text_message("conv-1", "bob"))
            .await
            .unwrap();
        messages::insert_message(&db, &text_message("conv-1", "alice"))
            .await
            .unwrap();
        messages::insert_message(&db, &text_message("conv-2", "carol"))
            .await
            .unwrap();
        messages::insert_message(&db, &text_message("conv-1", AGENT_USER_ID))
            .await
            .unwrap();

        let store = StandaloneProfileStore::new(db);
        let mut participants = store
            .get_participants(&ConversationId("conv-1".into()))
            .await
            .unwrap();
        participants.sort();
        assert_eq!(
            participants,
            vec![UserId("alice".into()), UserId("bob".into())]
        );
    }

    #[tokio::test]
    async fn last_read_round_trips_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let store = StandaloneProfileStore::new(db);
        let conversation = ConversationId("conv-1".into());
        store
            .set_last_read(&conversation, &UserId("bob".into()), "2026-08-24T10:00:00.000Z")
            .await
            .unwrap();
        let stamps = store.get_last_read_timestamps(&conversation).await.unwrap();
        assert_eq!(
            stamps.get(&UserId("bob".into())).map(String::as_str),
            Some("2026-08-24T10:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn unconfigured_ai_fails_every_call() {
        let ai = UnconfiguredAi;
        assert!(ai.embed("text").await.is_err());
        assert!(
            ai.complete("s", "u", CompletionOptions::default())
                .await
                .is_err()
        );
    }
}
