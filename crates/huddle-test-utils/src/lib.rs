// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Huddle integration tests.
//!
//! Mock collaborators and a harness for fast, deterministic, CI-runnable
//! tests without external services.
//!
//! # Components
//!
//! - [`MockAi`] - AI capability with scripted completions and an in-memory
//!   vector store
//! - [`MockProfileStore`] - seedable profile/participant store
//! - [`MockPush`] - push gateway that records every send
//! - [`TestHarness`] - in-memory database plus wired [`huddle_actor::ActorManager`]

pub mod harness;
pub mod mock_ai;
pub mod mock_profile;
pub mod mock_push;

pub use harness::TestHarness;
pub use mock_ai::MockAi;
pub use mock_profile::{MockProfileStore, PreviewRecord};
pub use mock_push::{MockPush, SentPush};
