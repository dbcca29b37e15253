// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The one-step-per-invocation workflow executor.
//!
//! `run_step` loads (or starts) the conversation's workflow, executes exactly
//! one step of the current state, persists the full state, and returns. A
//! step that fails is retried once; a second failure on the same step
//! transitions the workflow to `Failed`. The CONFIRM step does not commit
//! `Complete` itself: it returns [`StepOutcome::PlanReady`] so the caller can
//! broadcast the plan message first, then call [`WorkflowEngine::finalize`].

use std::sync::Arc;

use huddle_config::model::AgentConfig;
use huddle_core::traits::ai::{AiCapability, CompletionOptions, VectorItem};
use huddle_core::types::{ConversationId, UserId};
use huddle_core::HuddleError;
use huddle_storage::Database;
use huddle_storage::queries::{messages, workflows};
use tracing::{debug, info, warn};

use crate::parse;
use crate::state::{AgentState, FinalPlan, WorkflowStep};

const CLASSIFY_SYSTEM: &str = "You classify event-planning goals. Respond with JSON only: \
    {\"eventType\": string, \"needsVenue\": bool, \"eventDate\": string|null, \"eventTime\": string|null}.";

const AVAILABILITY_SYSTEM: &str = "You extract participant availability from chat messages. \
    Respond with JSON only: {\"summary\": string}.";

const PREFERENCES_SYSTEM: &str = "You extract dining preferences from chat messages. Respond \
    with JSON only: {\"cuisine\": string|null, \"location\": string|null, \"budget\": \
    string|null, \"dietary\": [string]}.";

const VENUES_SYSTEM: &str = "You suggest venues for an event. Respond with a JSON array only: \
    [{\"name\": string, \"description\": string, \"matchScore\": number}].";

/// Result of one engine invocation.
#[derive(Debug)]
pub enum StepOutcome {
    /// A non-terminal step completed; the workflow advanced one state.
    Advanced(AgentState),
    /// CONFIRM assembled the plan. The caller must broadcast `message` as a
    /// conversation message, then call [`WorkflowEngine::finalize`]. Crash
    /// between the two effects re-runs CONFIRM: at-least-once delivery.
    PlanReady { state: AgentState, message: String },
    /// The step failed twice; the workflow is terminally `Failed`.
    Failed { state: AgentState, error: String },
}

/// Drives the multi-step planning workflow for conversations.
pub struct WorkflowEngine {
    db: Database,
    ai: Arc<dyn AiCapability>,
    config: AgentConfig,
}

impl WorkflowEngine {
    pub fn new(db: Database, ai: Arc<dyn AiCapability>, config: AgentConfig) -> Self {
        Self { db, ai, config }
    }

    /// Execute exactly one step of the workflow for `goal`.
    ///
    /// A prior workflow that is terminal or was started for a different goal
    /// is discarded first; the new goal begins at `Init`.
    pub async fn run_step(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        goal: &str,
    ) -> Result<StepOutcome, HuddleError> {
        let mut state = self.load_or_start(conversation_id, user_id, goal).await?;
        let step = state.current_step;
        debug!(conversation = %conversation_id, %step, "executing workflow step");

        match self.execute_step(&mut state).await {
            Ok(plan_message) => {
                self.persist(&state).await?;
                Ok(self.outcome(state, plan_message))
            }
            Err(first) => {
                warn!(%step, error = %first, "workflow step failed, retrying once");
                state.record_error(step, first.to_string());
                state.current_step = step;
                match self.execute_step(&mut state).await {
                    Ok(plan_message) => {
                        self.persist(&state).await?;
                        Ok(self.outcome(state, plan_message))
                    }
                    Err(second) => {
                        warn!(%step, error = %second, "workflow step failed twice");
                        state.record_error(step, second.to_string());
                        state.current_step = WorkflowStep::Failed;
                        self.persist(&state).await?;
                        let error = second.to_string();
                        Ok(StepOutcome::Failed { state, error })
                    }
                }
            }
        }
    }

    /// Commit the terminal `Complete` state after the caller has broadcast
    /// the plan message.
    pub async fn finalize(&self, mut state: AgentState) -> Result<AgentState, HuddleError> {
        state.record_step(WorkflowStep::Confirm, "plan broadcast to conversation");
        state.current_step = WorkflowStep::Complete;
        self.persist(&state).await?;
        info!(conversation = %state.conversation_id, "workflow complete");
        Ok(state)
    }

    fn outcome(&self, state: AgentState, plan_message: Option<String>) -> StepOutcome {
        match plan_message {
            Some(message) => StepOutcome::PlanReady { state, message },
            None => StepOutcome::Advanced(state),
        }
    }

    async fn load_or_start(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        goal: &str,
    ) -> Result<AgentState, HuddleError> {
        if let Some(record) = workflows::get_workflow(&self.db, conversation_id).await? {
            if record.goal == goal {
                let state = AgentState::from_record(&record)?;
                if !state.current_step.is_terminal() {
                    return Ok(state);
                }
            }
            // Terminal or superseded by a new goal: discard before restart.
            debug!(conversation = %conversation_id, "discarding previous workflow");
            workflows::delete_workflow(&self.db, conversation_id).await?;
        }
        Ok(AgentState::new(
            conversation_id.clone(),
            user_id.clone(),
            goal.to_string(),
        ))
    }

    async fn persist(&self, state: &AgentState) -> Result<(), HuddleError> {
        workflows::upsert_workflow(&self.db, &state.to_record()?).await
    }

    /// Run the current step's body. Returns the plan message for CONFIRM,
    /// `None` for every other step.
    async fn execute_step(&self, state: &mut AgentState) -> Result<Option<String>, HuddleError> {
        match state.current_step {
            WorkflowStep::Init => {
                self.step_init(state).await?;
                Ok(None)
            }
            WorkflowStep::Availability => {
                self.step_availability(state).await?;
                Ok(None)
            }
            WorkflowStep::Preferences => {
                self.step_preferences(state).await?;
                Ok(None)
            }
            WorkflowStep::Venues => {
                self.step_venues(state).await?;
                Ok(None)
            }
            WorkflowStep::Poll => {
                self.step_poll(state);
                Ok(None)
            }
            WorkflowStep::Confirm => Ok(Some(self.step_confirm(state))),
            WorkflowStep::Complete | WorkflowStep::Failed => Err(HuddleError::Workflow {
                message: format!("cannot execute terminal step {}", state.current_step),
            }),
        }
    }

    /// INIT: classify the goal text and decide whether the venue branch is
    /// needed. An unparseable classification falls back to a venue-needing
    /// "gathering" rather than failing the step.
    async fn step_init(&self, state: &mut AgentState) -> Result<(), HuddleError> {
        let response = self
            .ai
            .complete(CLASSIFY_SYSTEM, &state.goal, self.opts())
            .await?;
        let classification = parse::parse_classification(&response).unwrap_or_else(|e| {
            warn!(error = %e, "classification unparseable, using fallback");
            Default::default()
        });

        state.needs_venue = classification.needs_venue;
        state.event_date = classification.event_date;
        state.event_time = classification.event_time;
        state.record_step(
            WorkflowStep::Init,
            format!(
                "classified goal as {} (venue needed: {})",
                classification.event_type, classification.needs_venue
            ),
        );
        state.event_type = Some(classification.event_type);
        state.current_step = WorkflowStep::Availability;
        Ok(())
    }

    /// AVAILABILITY: extract availability signals from recent messages.
    /// Branches straight to CONFIRM when no venue is needed.
    async fn step_availability(&self, state: &mut AgentState) -> Result<(), HuddleError> {
        let context = self
            .recent_messages(&state.conversation_id, self.config.availability_window)
            .await?;
        let prompt = format!("Goal: {}\n\nRecent messages:\n{}", state.goal, context);
        let response = self.ai.complete(AVAILABILITY_SYSTEM, &prompt, self.opts()).await?;
        let summary = parse::parse_availability(&response).unwrap_or_else(|e| {
            warn!(error = %e, "availability summary unparseable, using fallback");
            "No clear availability signals yet.".to_string()
        });

        state.availability = Some(summary);
        state.record_step(WorkflowStep::Availability, "extracted availability");
        state.current_step = if state.needs_venue {
            WorkflowStep::Preferences
        } else {
            WorkflowStep::Confirm
        };
        Ok(())
    }

    /// PREFERENCES: extract cuisine/location/budget/dietary signals from a
    /// larger message window. Always advances to VENUES.
    async fn step_preferences(&self, state: &mut AgentState) -> Result<(), HuddleError> {
        let context = self
            .recent_messages(&state.conversation_id, self.config.preferences_window)
            .await?;
        let prompt = format!("Goal: {}\n\nRecent messages:\n{}", state.goal, context);
        let response = self.ai.complete(PREFERENCES_SYSTEM, &prompt, self.opts()).await?;
        let preferences = parse::parse_preferences(&response).unwrap_or_else(|e| {
            warn!(error = %e, "preferences unparseable, using fallback");
            Default::default()
        });

        state.preferences = Some(preferences);
        state.record_step(WorkflowStep::Preferences, "extracted preferences");
        state.current_step = WorkflowStep::Venues;
        Ok(())
    }

    /// VENUES: generate ranked venue candidates. Indexing the candidates
    /// into the vector store is best-effort; a vector failure degrades
    /// rather than failing the step.
    async fn step_venues(&self, state: &mut AgentState) -> Result<(), HuddleError> {
        let preferences = serde_json::to_string(&state.preferences).unwrap_or_default();
        let prompt = format!(
            "Event: {}\nAvailability: {}\nPreferences: {}\nSuggest {} venues.",
            state.event_type.as_deref().unwrap_or("gathering"),
            state.availability.as_deref().unwrap_or("unknown"),
            preferences,
            self.config.venue_count
        );
        let response = self.ai.complete(VENUES_SYSTEM, &prompt, self.opts()).await?;
        let venues = parse::parse_venues(&response, self.config.venue_count).unwrap_or_else(|e| {
            warn!(error = %e, "venue list unparseable, continuing without candidates");
            Vec::new()
        });

        self.index_venues(state, &venues).await;

        state.record_step(
            WorkflowStep::Venues,
            format!("generated {} venue candidates", venues.len()),
        );
        state.venue_options = venues;
        state.current_step = if state.use_poll {
            WorkflowStep::Poll
        } else {
            WorkflowStep::Confirm
        };
        Ok(())
    }

    /// POLL (bypassed by default): deterministically declare the
    /// highest-match-score venue the winner. Candidates arrive pre-ranked.
    fn step_poll(&self, state: &mut AgentState) {
        state.poll_winner = state.venue_options.first().map(|venue| venue.name.clone());
        state.record_step(
            WorkflowStep::Poll,
            format!(
                "poll resolved to {}",
                state.poll_winner.as_deref().unwrap_or("no candidate")
            ),
        );
        state.current_step = WorkflowStep::Confirm;
    }

    /// CONFIRM: assemble the final plan with "to be decided" placeholders
    /// where nothing was extracted, and hand the plan message to the caller
    /// for broadcast. The terminal commit happens in [`Self::finalize`].
    fn step_confirm(&self, state: &mut AgentState) -> String {
        let venue = if state.needs_venue {
            state
                .poll_winner
                .clone()
                .or_else(|| state.venue_options.first().map(|venue| venue.name.clone()))
                .unwrap_or_else(|| "to be decided".to_string())
        } else {
            "no venue needed".to_string()
        };
        let plan = FinalPlan {
            event_type: state
                .event_type
                .clone()
                .unwrap_or_else(|| "gathering".to_string()),
            date: state
                .event_date
                .clone()
                .unwrap_or_else(|| "to be decided".to_string()),
            time: state
                .event_time
                .clone()
                .unwrap_or_else(|| "to be decided".to_string()),
            venue,
            summary: state
                .availability
                .clone()
                .unwrap_or_else(|| "No availability summary.".to_string()),
        };

        let message = format!(
            "Plan for \"{}\": {} on {} at {}, venue: {}.",
            state.goal, plan.event_type, plan.date, plan.time, plan.venue
        );
        state.final_plan = Some(plan);
        message
    }

    async fn recent_messages(
        &self,
        conversation_id: &ConversationId,
        window: usize,
    ) -> Result<String, HuddleError> {
        let page = messages::get_page(&self.db, conversation_id, window, None).await?;
        Ok(page
            .iter()
            .map(|msg| format!("{}: {}", msg.sender_id, msg.content))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn index_venues(&self, state: &AgentState, venues: &[crate::state::VenueOption]) {
        for venue in venues {
            let text = format!("{}: {}", venue.name, venue.description);
            let vector = match self.ai.embed(&text).await {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(error = %e, venue = %venue.name, "venue embedding failed, skipping");
                    continue;
                }
            };
            let item = VectorItem {
                id: format!("venue-{}-{}", state.id, venue.name),
                vector,
                metadata: serde_json::json!({
                    "kind": "venue",
                    "conversationId": state.conversation_id.0,
                    "name": venue.name,
                    "description": venue.description,
                }),
            };
            if let Err(e) = self.ai.vector_upsert(vec![item]).await {
                warn!(error = %e, venue = %venue.name, "venue vector upsert failed");
            }
        }
    }

    fn opts(&self) -> CompletionOptions {
        CompletionOptions {
            model: Some(self.config.model.clone()),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(0.2),
        }
    }
}
