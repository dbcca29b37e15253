// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Huddle chat server.
//!
//! The WebSocket route carries the conversation frame protocol; the REST
//! routes mirror history retrieval and expose the agent surface. Every
//! request is resolved to a conversation and forwarded to that
//! conversation's actor through the [`huddle_actor::ActorManager`]; the
//! gateway itself holds no conversation state beyond the per-connection
//! outbound channels.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{GatewayState, start_server};
