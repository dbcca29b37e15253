// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async traits for the external collaborators the conversation core calls.
//!
//! These are capability interfaces, not implementations: the core specifies
//! only the shape and ordering of calls into them. Production wiring plugs
//! in real backends; tests plug in the mocks from `huddle-test-utils`.

pub mod ai;
pub mod profile;
pub mod push;

pub use ai::AiCapability;
pub use profile::ProfileStore;
pub use push::PushGateway;
