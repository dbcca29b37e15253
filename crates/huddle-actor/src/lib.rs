// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-conversation stateful actor.
//!
//! One actor owns everything live about a conversation: its session registry
//! (who is connected right now), its message log writes, read/delivery
//! status transitions, push escalation for offline participants, and the
//! multi-step agent workflow. All mutating operations for one conversation
//! run strictly sequentially on the actor's task; different conversations
//! run in parallel. There is no in-memory state that is load-bearing across
//! an eviction boundary: the registry rebuilds from per-connection retained
//! attachments and everything else lives in storage.

pub mod actor;
pub mod manager;
pub mod protocol;
pub mod push;
pub mod reconcile;
pub mod registry;

pub use actor::{ActorCommand, ActorDeps, AgentRunOutcome, ConversationActor, HistoryPage};
pub use manager::ActorManager;
pub use protocol::{ClientFrame, PresenceStatus, ServerFrame};
pub use registry::{ConnectionHandle, SessionRegistry};
