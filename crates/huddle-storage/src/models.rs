// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The message and receipt types are defined in `huddle-core::types` for use
//! across crate boundaries and re-exported here for convenience. The workflow
//! row is storage-local: the planner serializes its step state into
//! `state_json` and owns its meaning.

pub use huddle_core::types::{Message, MessageKind, MessageStatus, ReadReceipt};

/// One persisted agent workflow row. At most one per conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRecord {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub goal: String,
    pub current_step: String,
    /// Serialized step state (availability, preferences, venues, plan,
    /// history, errors). Owned by the planner.
    pub state_json: String,
    pub created_at: String,
    pub updated_at: String,
}
