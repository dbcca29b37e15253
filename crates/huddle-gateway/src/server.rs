// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use huddle_actor::ActorManager;
use huddle_config::model::ServerConfig;
use huddle_core::HuddleError;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Routes every request to its conversation's actor.
    pub manager: Arc<ActorManager>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(manager: Arc<ActorManager>) -> Self {
        Self {
            manager,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ws", get(ws::ws_handler))
        .route(
            "/conversations/{conversation_id}/messages",
            get(handlers::get_messages),
        )
        .route(
            "/conversations/{conversation_id}/agent/run",
            post(handlers::post_agent_run),
        )
        .route(
            "/conversations/{conversation_id}/agent/query",
            post(handlers::post_agent_query),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP/WebSocket server.
///
/// Binds to the configured host:port and serves:
/// - GET  /ws (conversation frame protocol; identity via query params)
/// - GET  /conversations/{id}/messages
/// - POST /conversations/{id}/agent/run
/// - POST /conversations/{id}/agent/query
/// - GET  /health
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), HuddleError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HuddleError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| HuddleError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
