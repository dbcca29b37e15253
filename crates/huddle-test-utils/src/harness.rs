// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete conversation stack: temp SQLite
//! database, mock collaborators, and a wired [`ActorManager`]. Helpers
//! connect users and drive client frames the way the gateway does.

use std::sync::Arc;

use huddle_actor::actor::{ActorCommand, ActorDeps};
use huddle_actor::protocol::{ClientFrame, ServerFrame};
use huddle_actor::registry::ConnectionHandle;
use huddle_actor::ActorManager;
use huddle_config::HuddleConfig;
use huddle_core::types::{ConnectionId, ConversationId, SessionAttachment, UserId, now_rfc3339};
use huddle_core::HuddleError;
use huddle_storage::Database;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::mock_ai::MockAi;
use crate::mock_profile::MockProfileStore;
use crate::mock_push::MockPush;

/// Builder for test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    config: HuddleConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            config: HuddleConfig::default(),
        }
    }

    /// Pre-load scripted AI completions.
    pub fn with_ai_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Override the default configuration.
    pub fn with_config(mut self, config: HuddleConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the harness: temp database, mocks, wired manager.
    pub async fn build(self) -> Result<TestHarness, HuddleError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| HuddleError::Internal(format!("temp dir: {e}")))?;
        let db_path = temp_dir.path().join("huddle-test.db");
        let db = Database::open(&db_path.to_string_lossy(), self.config.storage.wal_mode).await?;

        let ai = Arc::new(MockAi::with_responses(self.responses));
        let profiles = Arc::new(MockProfileStore::new());
        let push = Arc::new(MockPush::new());

        let deps = ActorDeps {
            db: db.clone(),
            profiles: profiles.clone(),
            ai: ai.clone(),
            push: push.clone(),
            config: self.config,
        };
        let manager = ActorManager::new(deps);

        Ok(TestHarness {
            db,
            ai,
            profiles,
            push,
            manager,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired conversation stack over mocks and a temp database.
pub struct TestHarness {
    pub db: Database,
    pub ai: Arc<MockAi>,
    pub profiles: Arc<MockProfileStore>,
    pub push: Arc<MockPush>,
    pub manager: ActorManager,
    _temp_dir: tempfile::TempDir,
}

/// One connected test client: its connection identity plus the receiving
/// end of its outbound frame channel.
pub struct TestClient {
    pub conn_id: ConnectionId,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub rx: UnboundedReceiver<ServerFrame>,
}

impl TestClient {
    /// Pop the next frame without waiting. Panics when none is queued.
    pub fn next_frame(&mut self) -> ServerFrame {
        self.rx.try_recv().expect("expected a queued frame")
    }

    /// Drain every queued frame.
    pub fn drain(&mut self) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

impl TestHarness {
    /// Start building a harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with all defaults.
    pub async fn new() -> Result<Self, HuddleError> {
        Self::builder().build().await
    }

    /// Connect `user_id` to `conversation_id`, mirroring what the ws
    /// gateway does: make a frame channel, retain the attachment, attach.
    pub async fn connect(
        &self,
        conversation_id: &ConversationId,
        user_id: &str,
        conn_id: &str,
    ) -> TestClient {
        let (handle, rx): (ConnectionHandle, _) = tokio::sync::mpsc::unbounded_channel();
        let conn_id = ConnectionId(conn_id.to_string());
        let user_id = UserId(user_id.to_string());
        let attachment = SessionAttachment {
            user_id: user_id.clone(),
            conversation_id: conversation_id.clone(),
            connected_at: now_rfc3339(),
        };
        self.manager
            .attach(conn_id.clone(), attachment, handle)
            .await;
        TestClient {
            conn_id,
            user_id,
            conversation_id: conversation_id.clone(),
            rx,
        }
    }

    /// Deliver one client frame on behalf of a connected client.
    pub async fn send_frame(
        &self,
        client: &TestClient,
        frame: ClientFrame,
    ) -> Result<(), HuddleError> {
        self.manager
            .dispatch(
                &client.conversation_id,
                ActorCommand::Frame {
                    conn_id: client.conn_id.clone(),
                    user_id: client.user_id.clone(),
                    frame,
                },
            )
            .await
    }

    /// Disconnect a client.
    pub async fn disconnect(&self, client: &TestClient) {
        self.manager.detach(&client.conn_id).await;
    }

    /// Wait until the conversation's actor has drained everything queued
    /// before this call. The mailbox is FIFO, so a round-trip through it is
    /// a barrier.
    pub async fn settle(&self, conversation_id: &ConversationId) -> Result<(), HuddleError> {
        self.manager.list_online(conversation_id).await.map(|_| ())
    }
}
