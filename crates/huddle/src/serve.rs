// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: wire storage, actors, and the gateway.

use std::sync::Arc;

use huddle_actor::ActorManager;
use huddle_actor::actor::ActorDeps;
use huddle_config::HuddleConfig;
use huddle_core::HuddleError;
use huddle_gateway::{GatewayState, start_server};
use huddle_storage::Database;
use tracing::{info, warn};

use crate::adapters::{LoggingPush, StandaloneProfileStore, UnconfiguredAi};

/// Open storage, build the actor manager, and serve until shutdown.
pub async fn run(config: HuddleConfig) -> Result<(), HuddleError> {
    let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = %config.storage.database_path, "storage ready");

    // Standalone collaborators. A deployment with external profile, AI, or
    // push services swaps these at this seam.
    let profiles = Arc::new(StandaloneProfileStore::new(db.clone()));
    let ai = Arc::new(UnconfiguredAi);
    let push = Arc::new(LoggingPush);
    warn!("no AI provider configured: agent runs will fail cleanly, chat is unaffected");

    let deps = ActorDeps {
        db: db.clone(),
        profiles,
        ai,
        push,
        config: config.clone(),
    };
    let manager = Arc::new(ActorManager::new(deps));

    let state = GatewayState::new(manager);
    let result = start_server(&config.server, state).await;

    db.close().await?;
    result
}
