// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation actor: a single task that owns one conversation.
//!
//! All mutating operations for the conversation (sends, mark-reads, history
//! retrieval, agent steps) drain from one mailbox and run strictly
//! sequentially, which is what keeps message ordering and status
//! transitions correct without locks. Persistence of a message or receipt
//! is the first effect of its handler, before any broadcast or
//! notification: a crash loses only in-flight notifications, never the
//! record itself.

use std::sync::Arc;
use std::time::Duration;

use huddle_config::HuddleConfig;
use huddle_core::id::new_message_id;
use huddle_core::traits::ai::{AiCapability, VectorItem};
use huddle_core::types::{
    ConnectionId, ConversationId, Message, MessageId, MessageKind, MessageStatus,
    SessionAttachment, UserId, now_rfc3339,
};
use huddle_core::{HuddleError, ProfileStore, PushGateway};
use huddle_planner::engine::{StepOutcome, WorkflowEngine};
use huddle_planner::rag;
use huddle_planner::state::{FinalPlan, WorkflowStep};
use huddle_storage::Database;
use huddle_storage::queries::messages;
use huddle_storage::queries::receipts;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::protocol::{ClientFrame, ServerFrame, error_codes};
use crate::push::PushEscalator;
use crate::reconcile::reconcile_statuses;
use crate::registry::{ConnectionHandle, SessionRegistry};

/// Sender identity used when the agent posts its plan into the
/// conversation.
pub const AGENT_USER_ID: &str = "huddle-agent";

/// Everything an actor needs besides its conversation ID.
#[derive(Clone)]
pub struct ActorDeps {
    pub db: Database,
    pub profiles: Arc<dyn ProfileStore>,
    pub ai: Arc<dyn AiCapability>,
    pub push: Arc<dyn PushGateway>,
    pub config: HuddleConfig,
}

/// One page of history plus the continuation signal.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

/// Result of one `run_agent` invocation, as surfaced over HTTP.
#[derive(Debug, Clone)]
pub struct AgentRunOutcome {
    pub workflow_id: String,
    pub step: WorkflowStep,
    pub completed: bool,
    pub failed: bool,
    pub final_plan: Option<FinalPlan>,
    pub error: Option<String>,
}

/// Commands drained by the actor task.
pub enum ActorCommand {
    /// Register a connection. Carries the retained attachment so the same
    /// command rebuilds the registry after rehydration.
    Attach {
        conn_id: ConnectionId,
        attachment: SessionAttachment,
        handle: ConnectionHandle,
    },
    Detach {
        conn_id: ConnectionId,
    },
    /// One parsed client frame from a live connection.
    Frame {
        conn_id: ConnectionId,
        user_id: UserId,
        frame: ClientFrame,
    },
    /// Advance the agent workflow by exactly one step.
    RunAgent {
        goal: String,
        user_id: UserId,
        reply: oneshot::Sender<Result<AgentRunOutcome, HuddleError>>,
    },
    /// Retrieval-augmented question answering over the conversation.
    RagQuery {
        query: String,
        user_id: UserId,
        reply: oneshot::Sender<Result<String, HuddleError>>,
    },
    /// History page for the REST surface (same semantics as `get_history`).
    GetHistory {
        user_id: UserId,
        limit: Option<usize>,
        before: Option<MessageId>,
        reply: oneshot::Sender<Result<HistoryPage, HuddleError>>,
    },
    /// Current online users (health/tests).
    ListOnline {
        reply: oneshot::Sender<Vec<UserId>>,
    },
}

/// The per-conversation actor.
pub struct ConversationActor {
    conversation_id: ConversationId,
    registry: SessionRegistry,
    deps: ActorDeps,
    escalator: PushEscalator,
    engine: WorkflowEngine,
}

impl ConversationActor {
    /// Spawn the actor task and return its mailbox sender.
    ///
    /// The actor exits when every sender is dropped or after
    /// `actor.idle_evict_secs` of mailbox silence (eviction). Nothing held
    /// in memory here is load-bearing across that boundary.
    pub fn spawn(conversation_id: ConversationId, deps: ActorDeps) -> mpsc::Sender<ActorCommand> {
        let (tx, rx) = mpsc::channel(deps.config.actor.mailbox_capacity);
        let escalator = PushEscalator::new(
            deps.profiles.clone(),
            deps.push.clone(),
            deps.config.push.enabled,
            deps.config.push.batch_size,
        );
        let engine = WorkflowEngine::new(
            deps.db.clone(),
            deps.ai.clone(),
            deps.config.agent.clone(),
        );
        let idle = Duration::from_secs(deps.config.actor.idle_evict_secs);
        let actor = Self {
            conversation_id,
            registry: SessionRegistry::new(),
            deps,
            escalator,
            engine,
        };
        tokio::spawn(actor.run(rx, idle));
        tx
    }

    async fn run(mut self, mut rx: mpsc::Receiver<ActorCommand>, idle: Duration) {
        debug!(conversation = %self.conversation_id, "actor started");
        loop {
            match tokio::time::timeout(idle, rx.recv()).await {
                Ok(Some(cmd)) => self.handle(cmd).await,
                Ok(None) => break,
                Err(_) => {
                    debug!(conversation = %self.conversation_id, "idle, evicting actor");
                    // Stop accepting, then drain anything that raced in while
                    // the timer fired: a command whose send already succeeded
                    // must never be dropped.
                    rx.close();
                    while let Some(cmd) = rx.recv().await {
                        self.handle(cmd).await;
                    }
                    break;
                }
            }
        }
        debug!(conversation = %self.conversation_id, "actor stopped");
    }

    async fn handle(&mut self, cmd: ActorCommand) {
        match cmd {
            ActorCommand::Attach {
                conn_id,
                attachment,
                handle,
            } => {
                let online = self.registry.register(
                    conn_id.clone(),
                    attachment.user_id,
                    attachment.connected_at,
                    handle,
                );
                self.registry.send_to(
                    &conn_id,
                    &ServerFrame::Connected {
                        online_user_ids: online,
                    },
                );
            }
            ActorCommand::Detach { conn_id } => {
                self.registry.unregister(&conn_id);
            }
            ActorCommand::Frame {
                conn_id,
                user_id,
                frame,
            } => self.handle_frame(conn_id, user_id, frame).await,
            ActorCommand::RunAgent {
                goal,
                user_id,
                reply,
            } => {
                let outcome = self.run_agent(goal, user_id).await;
                let _ = reply.send(outcome);
            }
            ActorCommand::RagQuery {
                query,
                user_id,
                reply,
            } => {
                debug!(conversation = %self.conversation_id, user = %user_id, "rag query");
                let answer = rag::answer_query(
                    &self.deps.ai,
                    &self.conversation_id,
                    &query,
                    &self.deps.config.agent,
                )
                .await;
                let _ = reply.send(answer);
            }
            ActorCommand::GetHistory {
                user_id,
                limit,
                before,
                reply,
            } => {
                let page = self.fetch_history(&user_id, limit, before.as_ref()).await;
                let _ = reply.send(page);
            }
            ActorCommand::ListOnline { reply } => {
                let _ = reply.send(self.registry.list_online());
            }
        }
    }

    async fn handle_frame(&mut self, conn_id: ConnectionId, user_id: UserId, frame: ClientFrame) {
        match frame {
            ClientFrame::SendMessage {
                content,
                kind,
                media_url,
                media_type,
                media_size,
                client_id,
            } => {
                self.handle_send_message(
                    &conn_id, user_id, content, kind, media_url, media_type, media_size, client_id,
                )
                .await;
            }
            ClientFrame::MarkRead {
                message_id,
                user_id: reader_id,
            } => {
                // A connection may only mark reads for its own user.
                if reader_id != user_id {
                    self.registry.send_to(
                        &conn_id,
                        &ServerFrame::error(
                            error_codes::MALFORMED_FRAME,
                            "markRead user does not match the connection",
                        ),
                    );
                    return;
                }
                self.handle_mark_read(&conn_id, message_id, user_id).await;
            }
            ClientFrame::GetHistory { limit, before } => {
                self.handle_get_history_frame(&conn_id, &user_id, limit, before)
                    .await;
            }
            ClientFrame::Typing { is_typing } => {
                self.registry.fan_out(
                    &ServerFrame::Typing { user_id, is_typing },
                    Some(&conn_id),
                    None,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_send_message(
        &mut self,
        conn_id: &ConnectionId,
        sender_id: UserId,
        content: String,
        kind: MessageKind,
        media_url: Option<String>,
        media_type: Option<String>,
        media_size: Option<i64>,
        client_id: String,
    ) {
        let now = now_rfc3339();
        let message = Message {
            id: new_message_id(),
            conversation_id: self.conversation_id.clone(),
            sender_id,
            content,
            kind,
            status: MessageStatus::Sent,
            media_url,
            media_type,
            media_size,
            created_at: now.clone(),
            updated_at: now,
        };
        self.post_message(message, Some((conn_id, client_id))).await;
    }

    /// The single broadcast path for new messages: used by client sends and
    /// by the agent posting its plan.
    ///
    /// Ordering: persist -> ack sender (`sent` keyed by client ID) -> fan
    /// out `new_message` -> push escalation for unregistered participants ->
    /// `delivered` transition when at least one live recipient existed.
    async fn post_message(
        &mut self,
        message: Message,
        ack: Option<(&ConnectionId, String)>,
    ) -> Option<Message> {
        // Durable first. A failure here aborts the whole operation with no
        // broadcast; nothing downstream may corrupt the log.
        if let Err(e) = messages::insert_message(&self.deps.db, &message).await {
            error!(conversation = %self.conversation_id, error = %e, "message append failed");
            if let Some((conn_id, _)) = ack {
                self.registry.send_to(
                    conn_id,
                    &ServerFrame::error(error_codes::INTERNAL, "message could not be stored"),
                );
            }
            return None;
        }

        if let Some((conn_id, client_id)) = &ack {
            self.registry.send_to(
                conn_id,
                &ServerFrame::MessageStatus {
                    message_id: None,
                    client_id: Some(client_id.clone()),
                    status: MessageStatus::Sent,
                    server_timestamp: message.created_at.clone(),
                },
            );
        }

        let reached = self.registry.fan_out(
            &ServerFrame::NewMessage {
                message: message.clone(),
            },
            ack.as_ref().map(|(conn_id, _)| *conn_id),
            Some(&message.sender_id),
        );

        if let Err(e) = self
            .deps
            .profiles
            .set_conversation_preview(
                &self.conversation_id,
                &message.created_at,
                &message.content,
                &message.sender_id,
            )
            .await
        {
            warn!(error = %e, "conversation preview update failed");
        }

        self.index_message(&message).await;

        let online = self.registry.list_online();
        self.escalator.notify_offline(&message, &online).await;

        let mut result = message.clone();
        if reached > 0 {
            let ts = now_rfc3339();
            match messages::update_status(&self.deps.db, &message.id, MessageStatus::Delivered, &ts)
                .await
            {
                Ok(changed) => {
                    if changed {
                        result.status = MessageStatus::Delivered;
                        result.updated_at = ts.clone();
                        self.registry.broadcast(&ServerFrame::MessageStatus {
                            message_id: Some(message.id.clone()),
                            client_id: None,
                            status: MessageStatus::Delivered,
                            server_timestamp: ts,
                        });
                    }
                }
                Err(e) => warn!(error = %e, "delivered transition failed"),
            }
        }
        Some(result)
    }

    async fn handle_mark_read(
        &mut self,
        conn_id: &ConnectionId,
        message_id: MessageId,
        reader_id: UserId,
    ) {
        let message = match messages::get_message(&self.deps.db, &message_id).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.registry.send_to(
                    conn_id,
                    &ServerFrame::error(error_codes::UNKNOWN_MESSAGE, "no such message"),
                );
                return;
            }
            Err(e) => {
                error!(error = %e, "message lookup failed");
                self.registry.send_to(
                    conn_id,
                    &ServerFrame::error(error_codes::INTERNAL, "message lookup failed"),
                );
                return;
            }
        };
        if message.sender_id == reader_id {
            debug!(message = %message_id, "ignoring sender marking own message read");
            return;
        }

        let read_at = now_rfc3339();
        // The receipt row is the durable record; it lands before anything
        // else happens.
        if let Err(e) =
            receipts::upsert_receipt(&self.deps.db, &message_id, &reader_id, &read_at).await
        {
            error!(error = %e, "receipt upsert failed");
            self.registry.send_to(
                conn_id,
                &ServerFrame::error(error_codes::INTERNAL, "receipt could not be stored"),
            );
            return;
        }
        if let Err(e) =
            messages::update_status(&self.deps.db, &message_id, MessageStatus::Read, &read_at).await
        {
            warn!(error = %e, "read transition failed");
        }
        if let Err(e) = self
            .deps
            .profiles
            .set_last_read(&self.conversation_id, &reader_id, &read_at)
            .await
        {
            warn!(error = %e, "last-read update failed");
        }

        self.registry.broadcast(&ServerFrame::MessageRead {
            message_id: message_id.clone(),
            user_id: reader_id.clone(),
            read_at: read_at.clone(),
        });

        let online = self.registry.list_online();
        self.escalator
            .notify_read_receipt(&message, &reader_id, &read_at, &online)
            .await;
    }

    async fn handle_get_history_frame(
        &mut self,
        conn_id: &ConnectionId,
        user_id: &UserId,
        limit: Option<usize>,
        before: Option<MessageId>,
    ) {
        match self.fetch_history(user_id, limit, before.as_ref()).await {
            Ok(page) => {
                // Respond to the requester only, then broadcast the
                // best-effort delivered upgrades.
                self.registry.send_to(
                    conn_id,
                    &ServerFrame::HistoryResponse {
                        messages: page.messages,
                        has_more: page.has_more,
                    },
                );
            }
            Err(e) => {
                error!(error = %e, "history retrieval failed");
                self.registry.send_to(
                    conn_id,
                    &ServerFrame::error(error_codes::INTERNAL, "history retrieval failed"),
                );
            }
        }
    }

    /// Shared history path for the ws frame and the REST mirror.
    ///
    /// Fetches the page, reconciles statuses against stored last-read
    /// timestamps, then retroactively upgrades others' still-`sent`
    /// messages to `delivered` and notifies senders (best-effort, not
    /// exactly-once).
    async fn fetch_history(
        &mut self,
        requester: &UserId,
        limit: Option<usize>,
        before: Option<&MessageId>,
    ) -> Result<HistoryPage, HuddleError> {
        let limit = limit
            .unwrap_or(self.deps.config.history.default_limit)
            .clamp(1, self.deps.config.history.max_limit);

        let mut page =
            messages::get_page(&self.deps.db, &self.conversation_id, limit, before).await?;
        let has_more = page.len() == limit;

        match self
            .deps
            .profiles
            .get_last_read_timestamps(&self.conversation_id)
            .await
        {
            Ok(last_read) => {
                reconcile_statuses(&mut page, &last_read);
            }
            Err(e) => warn!(error = %e, "last-read lookup failed, skipping reconciliation"),
        }

        let to_upgrade: Vec<MessageId> = page
            .iter()
            .filter(|msg| msg.sender_id != *requester && msg.status == MessageStatus::Sent)
            .map(|msg| msg.id.clone())
            .collect();
        if !to_upgrade.is_empty() {
            let ts = now_rfc3339();
            match messages::mark_delivered_batch(&self.deps.db, to_upgrade, &ts).await {
                Ok(upgraded) => {
                    for id in &upgraded {
                        if let Some(msg) = page.iter_mut().find(|msg| msg.id == *id) {
                            msg.status = msg.status.advance(MessageStatus::Delivered);
                            msg.updated_at = ts.clone();
                        }
                        self.registry.broadcast(&ServerFrame::MessageStatus {
                            message_id: Some(id.clone()),
                            client_id: None,
                            status: MessageStatus::Delivered,
                            server_timestamp: ts.clone(),
                        });
                    }
                }
                Err(e) => warn!(error = %e, "retroactive delivered upgrade failed"),
            }
        }

        Ok(HistoryPage {
            messages: page,
            has_more,
        })
    }

    /// One agent step. When CONFIRM hands back the plan, the plan message is
    /// broadcast through the ordinary message path *before* the terminal
    /// state commits -- at-least-once, by design.
    async fn run_agent(
        &mut self,
        goal: String,
        user_id: UserId,
    ) -> Result<AgentRunOutcome, HuddleError> {
        let outcome = self
            .engine
            .run_step(&self.conversation_id, &user_id, &goal)
            .await?;
        match outcome {
            StepOutcome::Advanced(state) => Ok(AgentRunOutcome {
                workflow_id: state.id.clone(),
                step: state.current_step,
                completed: false,
                failed: false,
                final_plan: state.final_plan,
                error: None,
            }),
            StepOutcome::PlanReady { state, message } => {
                let now = now_rfc3339();
                let plan_message = Message {
                    id: new_message_id(),
                    conversation_id: self.conversation_id.clone(),
                    sender_id: UserId(AGENT_USER_ID.to_string()),
                    content: message,
                    kind: MessageKind::Text,
                    status: MessageStatus::Sent,
                    media_url: None,
                    media_type: None,
                    media_size: None,
                    created_at: now.clone(),
                    updated_at: now,
                };
                self.post_message(plan_message, None).await;

                let state = self.engine.finalize(state).await?;
                info!(conversation = %self.conversation_id, "agent plan posted");
                Ok(AgentRunOutcome {
                    workflow_id: state.id.clone(),
                    step: state.current_step,
                    completed: true,
                    failed: false,
                    final_plan: state.final_plan,
                    error: None,
                })
            }
            StepOutcome::Failed { state, error } => Ok(AgentRunOutcome {
                workflow_id: state.id.clone(),
                step: state.current_step,
                completed: false,
                failed: true,
                final_plan: None,
                error: Some(error),
            }),
        }
    }

    /// Best-effort semantic indexing of a new message for RAG retrieval.
    async fn index_message(&self, message: &Message) {
        if message.kind != MessageKind::Text || message.content.trim().is_empty() {
            return;
        }
        let vector = match self.deps.ai.embed(&message.content).await {
            Ok(vector) => vector,
            Err(e) => {
                debug!(error = %e, "message embedding failed, skipping index");
                return;
            }
        };
        let item = VectorItem {
            id: message.id.0.clone(),
            vector,
            metadata: serde_json::json!({
                "kind": "message",
                "conversationId": message.conversation_id.0,
                "senderId": message.sender_id.0,
                "content": message.content,
                "createdAt": message.created_at,
            }),
        };
        if let Err(e) = self.deps.ai.vector_upsert(vec![item]).await {
            debug!(error = %e, "message vector upsert failed");
        }
    }
}
