// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Huddle chat server.

use thiserror::Error;

/// The primary error type used across all Huddle crates.
#[derive(Debug, Error)]
pub enum HuddleError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Malformed or unrecognized wire frames from a client.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// AI capability errors (completion, embedding, vector search).
    #[error("ai error: {message}")]
    Ai {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Push gateway errors. Always treated as non-fatal by callers.
    #[error("push error: {message}")]
    Push { message: String },

    /// Agent workflow errors (illegal transition, step execution failure).
    #[error("workflow error: {message}")]
    Workflow { message: String },

    /// A conversation actor's mailbox is gone (actor evicted or crashed).
    #[error("conversation actor unavailable: {0}")]
    ActorUnavailable(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HuddleError {
    /// Shorthand for a storage error wrapping an arbitrary source.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        HuddleError::Storage {
            source: Box::new(source),
        }
    }

    /// Shorthand for an AI error with a message only.
    pub fn ai(message: impl Into<String>) -> Self {
        HuddleError::Ai {
            message: message.into(),
            source: None,
        }
    }
}
