// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! History retrieval over REST shares the actor's `get_history` path, so it
//! has identical reconciliation and retroactive-delivery semantics to the
//! WebSocket frame.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use huddle_actor::actor::ActorCommand;
use huddle_core::HuddleError;
use huddle_core::types::{ConversationId, Message, MessageId, UserId};
use huddle_planner::state::{FinalPlan, WorkflowStep};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

fn error_response(err: HuddleError) -> Response {
    let status = match &err {
        HuddleError::ActorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        HuddleError::Protocol { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn reply_dropped() -> Response {
    error_response(HuddleError::Internal(
        "actor dropped the reply channel".to_string(),
    ))
}

/// Query string for GET /conversations/{id}/messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub before: Option<String>,
}

/// Response body for GET /conversations/{id}/messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

/// GET /conversations/{conversation_id}/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let conversation_id = ConversationId(conversation_id);
    let (reply, rx) = oneshot::channel();
    let command = ActorCommand::GetHistory {
        user_id: UserId(query.user_id),
        limit: query.limit,
        before: query.before.map(MessageId),
        reply,
    };
    if let Err(e) = state.manager.dispatch(&conversation_id, command).await {
        return error_response(e);
    }
    match rx.await {
        Ok(Ok(page)) => (
            StatusCode::OK,
            Json(HistoryResponse {
                messages: page.messages,
                has_more: page.has_more,
            }),
        )
            .into_response(),
        Ok(Err(e)) => error_response(e),
        Err(_) => reply_dropped(),
    }
}

/// Request body for POST /conversations/{id}/agent/run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunRequest {
    pub goal: String,
    pub user_id: String,
}

/// Response body for POST /conversations/{id}/agent/run: the state of the
/// workflow after exactly one step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunResponse {
    pub success: bool,
    pub workflow_id: String,
    pub step: WorkflowStep,
    pub completed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_plan: Option<FinalPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /conversations/{conversation_id}/agent/run
///
/// Advances the conversation's planning workflow by one step. Clients call
/// it repeatedly until `completed` or `failed`.
pub async fn post_agent_run(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<AgentRunRequest>,
) -> Response {
    let conversation_id = ConversationId(conversation_id);
    let (reply, rx) = oneshot::channel();
    let command = ActorCommand::RunAgent {
        goal: body.goal,
        user_id: UserId(body.user_id),
        reply,
    };
    if let Err(e) = state.manager.dispatch(&conversation_id, command).await {
        return error_response(e);
    }
    match rx.await {
        Ok(Ok(outcome)) => (
            StatusCode::OK,
            Json(AgentRunResponse {
                success: !outcome.failed,
                workflow_id: outcome.workflow_id,
                step: outcome.step,
                completed: outcome.completed,
                failed: outcome.failed,
                final_plan: outcome.final_plan,
                error: outcome.error,
            }),
        )
            .into_response(),
        Ok(Err(e)) => error_response(e),
        Err(_) => reply_dropped(),
    }
}

/// Request body for POST /conversations/{id}/agent/query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentQueryRequest {
    pub query: String,
    pub user_id: String,
}

/// Response body for POST /conversations/{id}/agent/query.
#[derive(Debug, Serialize)]
pub struct AgentQueryResponse {
    pub success: bool,
    pub answer: String,
}

/// POST /conversations/{conversation_id}/agent/query
///
/// Retrieval-augmented question answering over the conversation's indexed
/// messages.
pub async fn post_agent_query(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<AgentQueryRequest>,
) -> Response {
    let conversation_id = ConversationId(conversation_id);
    let (reply, rx) = oneshot::channel();
    let command = ActorCommand::RagQuery {
        query: body.query,
        user_id: UserId(body.user_id),
        reply,
    };
    if let Err(e) = state.manager.dispatch(&conversation_id, command).await {
        return error_response(e);
    }
    match rx.await {
        Ok(Ok(answer)) => (
            StatusCode::OK,
            Json(AgentQueryResponse {
                success: true,
                answer,
            }),
        )
            .into_response(),
        Ok(Err(e)) => error_response(e),
        Err(_) => reply_dropped(),
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
