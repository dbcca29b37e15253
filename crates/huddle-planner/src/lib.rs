// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent workflow engine: a retryable state machine driving a multi-step
//! event-planning conversation.
//!
//! Each invocation executes exactly one step of the current state and
//! persists the full workflow before returning, which makes the workflow
//! resumable across separate external calls and across actor eviction.
//! The CONFIRM step hands its plan message back to the caller to broadcast
//! *before* the terminal state is committed -- an at-least-once delivery
//! property, not a bug (a crash between the two effects re-runs CONFIRM,
//! which only posts a message and transitions state).

pub mod engine;
pub mod parse;
pub mod rag;
pub mod state;

pub use engine::{StepOutcome, WorkflowEngine};
pub use state::{AgentState, FinalPlan, Preferences, StepError, StepRecord, VenueOption, WorkflowStep};
