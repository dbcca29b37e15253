// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types and collaborator traits for the Huddle chat server.
//!
//! Defines the shared error type, the conversation domain model (messages,
//! receipts, session attachments), timestamp-ordered message IDs, and the
//! async traits for external collaborators (profile store, AI capability,
//! push gateway).

pub mod error;
pub mod id;
pub mod traits;
pub mod types;

pub use error::HuddleError;
pub use traits::ai::{AiCapability, CompletionOptions, VectorItem, VectorMatch};
pub use traits::profile::ProfileStore;
pub use traits::push::PushGateway;
