// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seedable in-memory profile store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use huddle_core::HuddleError;
use huddle_core::traits::profile::ProfileStore;
use huddle_core::types::{ConversationId, UserId};

/// One recorded conversation-preview update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRecord {
    pub conversation_id: ConversationId,
    pub timestamp: String,
    pub content: String,
    pub sender_id: UserId,
}

#[derive(Default)]
struct Inner {
    participants: HashMap<ConversationId, Vec<UserId>>,
    display_names: HashMap<UserId, String>,
    push_tokens: HashMap<UserId, Vec<String>>,
    last_read: HashMap<ConversationId, HashMap<UserId, String>>,
    previews: Vec<PreviewRecord>,
}

/// In-memory [`ProfileStore`] with seeding and inspection helpers.
#[derive(Default)]
pub struct MockProfileStore {
    inner: Mutex<Inner>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the member list of a conversation.
    pub async fn seed_participants(&self, conversation_id: &ConversationId, users: &[&str]) {
        self.inner.lock().await.participants.insert(
            conversation_id.clone(),
            users.iter().map(|u| UserId(u.to_string())).collect(),
        );
    }

    /// Seed a display name.
    pub async fn seed_display_name(&self, user_id: &UserId, name: &str) {
        self.inner
            .lock()
            .await
            .display_names
            .insert(user_id.clone(), name.to_string());
    }

    /// Seed push tokens for a user.
    pub async fn seed_push_tokens(&self, user_id: &UserId, tokens: &[&str]) {
        self.inner.lock().await.push_tokens.insert(
            user_id.clone(),
            tokens.iter().map(|t| t.to_string()).collect(),
        );
    }

    /// Seed a last-read timestamp directly.
    pub async fn seed_last_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        timestamp: &str,
    ) {
        self.inner
            .lock()
            .await
            .last_read
            .entry(conversation_id.clone())
            .or_default()
            .insert(user_id.clone(), timestamp.to_string());
    }

    /// Every preview update recorded so far, oldest first.
    pub async fn previews(&self) -> Vec<PreviewRecord> {
        self.inner.lock().await.previews.clone()
    }

    /// The stored last-read timestamp for a user, if any.
    pub async fn last_read_for(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Option<String> {
        self.inner
            .lock()
            .await
            .last_read
            .get(conversation_id)
            .and_then(|per_user| per_user.get(user_id))
            .cloned()
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn get_participants(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, HuddleError> {
        Ok(self
            .inner
            .lock()
            .await
            .participants
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_display_name(&self, user_id: &UserId) -> Result<Option<String>, HuddleError> {
        Ok(self.inner.lock().await.display_names.get(user_id).cloned())
    }

    async fn get_push_tokens(&self, user_id: &UserId) -> Result<Vec<String>, HuddleError> {
        Ok(self
            .inner
            .lock()
            .await
            .push_tokens
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_last_read_timestamps(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<HashMap<UserId, String>, HuddleError> {
        Ok(self
            .inner
            .lock()
            .await
            .last_read
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
        self.inner
            .lock()
            .await
            .last_read
            .entry(conversation_id.clone())
            .or_default()
            .insert(user_id.clone(), timestamp.to_string());
        Ok(())
    }

    async fn set_conversation_preview(
        &self,
        conversation_id: &ConversationId,
        timestamp: &str,
        content: &str,
        sender_id: &UserId,
    ) -> Result<(), HuddleError> {
        self.inner.lock().await.previews.push(PreviewRecord {
            conversation_id: conversation_id.clone(),
            timestamp: timestamp.to_string(),
            content: content.to_string(),
            sender_id: sender_id.clone(),
        });
        Ok(())
    }
}
