// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow state machine types.
//!
//! Legal transitions (initial `Init`, terminals `Complete`/`Failed`):
//! `Init -> Availability -> {Preferences -> Venues -> Confirm | Confirm}
//! -> Complete`, with `Poll` reachable between `Venues` and `Confirm` when
//! explicitly enabled. Any non-terminal state may transition to `Failed`.

use huddle_core::HuddleError;
use huddle_core::types::{ConversationId, UserId, now_rfc3339};
use huddle_storage::WorkflowRecord;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One state of the planning workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Init,
    Availability,
    Preferences,
    Venues,
    Poll,
    Confirm,
    Complete,
    Failed,
}

impl WorkflowStep {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStep::Complete | WorkflowStep::Failed)
    }
}

/// Extracted dining/venue preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub cuisine: Option<String>,
    pub location: Option<String>,
    pub budget: Option<String>,
    pub dietary: Vec<String>,
}

/// One generated venue candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 0.0..=1.0 fit against the extracted preferences.
    #[serde(default)]
    pub match_score: f32,
}

/// The assembled plan the CONFIRM step broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalPlan {
    pub event_type: String,
    pub date: String,
    pub time: String,
    pub venue: String,
    pub summary: String,
}

/// One completed step, for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: WorkflowStep,
    pub at: String,
    pub note: String,
}

/// One step failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub step: WorkflowStep,
    pub at: String,
    pub message: String,
}

/// Full persisted workflow state. One active instance per conversation;
/// superseded instances are deleted before a new goal starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub id: String,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub goal: String,
    pub current_step: WorkflowStep,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default = "default_true")]
    pub needs_venue: bool,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub venue_options: Vec<VenueOption>,
    /// Route VENUES through POLL instead of straight to CONFIRM. Off by
    /// default so the workflow never blocks on a vote.
    #[serde(default)]
    pub use_poll: bool,
    #[serde(default)]
    pub poll_winner: Option<String>,
    #[serde(default)]
    pub final_plan: Option<FinalPlan>,
    #[serde(default)]
    pub step_history: Vec<StepRecord>,
    #[serde(default)]
    pub errors: Vec<StepError>,
    pub created_at: String,
}

fn default_true() -> bool {
    true
}

impl AgentState {
    /// Fresh workflow at `Init` for a new goal.
    pub fn new(conversation_id: ConversationId, user_id: UserId, goal: String) -> Self {
        Self {
            id: format!("wf-{}", uuid::Uuid::new_v4()),
            conversation_id,
            user_id,
            goal,
            current_step: WorkflowStep::Init,
            event_type: None,
            needs_venue: true,
            event_date: None,
            event_time: None,
            availability: None,
            preferences: None,
            venue_options: Vec::new(),
            use_poll: false,
            poll_winner: None,
            final_plan: None,
            step_history: Vec::new(),
            errors: Vec::new(),
            created_at: now_rfc3339(),
        }
    }

    /// Append an audit record for a completed step.
    pub fn record_step(&mut self, step: WorkflowStep, note: impl Into<String>) {
        self.step_history.push(StepRecord {
            step,
            at: now_rfc3339(),
            note: note.into(),
        });
    }

    /// Append a failure record for a step attempt.
    pub fn record_error(&mut self, step: WorkflowStep, message: impl Into<String>) {
        self.errors.push(StepError {
            step,
            at: now_rfc3339(),
            message: message.into(),
        });
    }

    /// Serialize into the storage row shape.
    pub fn to_record(&self) -> Result<WorkflowRecord, HuddleError> {
        let state_json = serde_json::to_string(self)
            .map_err(|e| HuddleError::Workflow {
                message: format!("failed to serialize workflow state: {e}"),
            })?;
        Ok(WorkflowRecord {
            id: self.id.clone(),
            conversation_id: self.conversation_id.0.clone(),
            user_id: self.user_id.0.clone(),
            goal: self.goal.clone(),
            current_step: self.current_step.to_string(),
            state_json,
            created_at: self.created_at.clone(),
            updated_at: now_rfc3339(),
        })
    }

    /// Deserialize from the storage row shape.
    pub fn from_record(record: &WorkflowRecord) -> Result<Self, HuddleError> {
        serde_json::from_str(&record.state_json).map_err(|e| HuddleError::Workflow {
            message: format!("failed to deserialize workflow state: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_display_round_trips() {
        assert_eq!(WorkflowStep::Availability.to_string(), "availability");
        assert_eq!(
            "confirm".parse::<WorkflowStep>().unwrap(),
            WorkflowStep::Confirm
        );
    }

    #[test]
    fn terminal_states() {
        assert!(WorkflowStep::Complete.is_terminal());
        assert!(WorkflowStep::Failed.is_terminal());
        assert!(!WorkflowStep::Init.is_terminal());
        assert!(!WorkflowStep::Confirm.is_terminal());
    }

    #[test]
    fn state_round_trips_through_record() {
        let mut state = AgentState::new(
            ConversationId("conv-1".into()),
            UserId("alice".into()),
            "plan team lunch".into(),
        );
        state.current_step = WorkflowStep::Venues;
        state.venue_options.push(VenueOption {
            name: "Trattoria Nord".into(),
            description: "Quiet Italian spot".into(),
            match_score: 0.9,
        });
        state.record_step(WorkflowStep::Preferences, "extracted preferences");

        let record = state.to_record().unwrap();
        assert_eq!(record.current_step, "venues");
        let restored = AgentState::from_record(&record).unwrap();
        assert_eq!(restored, state);
    }
}
