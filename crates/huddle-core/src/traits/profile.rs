// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile/participant store trait.
//!
//! Owned by an external service. The actor writes last-read timestamps and
//! conversation previews to it but treats it as shared state with no
//! exclusivity.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::HuddleError;
use crate::types::{ConversationId, UserId};

/// External profile and conversation-metadata store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// All member user IDs of a conversation, including offline ones.
    async fn get_participants(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, HuddleError>;

    /// Display name for a user, if known.
    async fn get_display_name(&self, user_id: &UserId) -> Result<Option<String>, HuddleError>;

    /// Registered push device tokens for a user. Empty when none.
    async fn get_push_tokens(&self, user_id: &UserId) -> Result<Vec<String>, HuddleError>;

    /// Per-user most recent read timestamp for a conversation (RFC 3339).
    async fn get_last_read_timestamps(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<HashMap<UserId, String>, HuddleError>;

    /// Record that `user_id` has read the conversation up to `timestamp`.
    async fn set_last_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        timestamp: &str,
    ) -> Result<(), HuddleError>;

    /// Update the conversation-list preview (latest message snippet).
    async fn set_conversation_preview(
        &self,
        conversation_id: &ConversationId,
        timestamp: &str,
        content: &str,
        sender_id: &UserId,
    ) -> Result<(), HuddleError>;
}
