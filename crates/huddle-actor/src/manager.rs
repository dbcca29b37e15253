// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Actor lifecycle: lazy spawn, idle eviction, transparent rehydration.
//!
//! The manager keeps one mailbox sender per live conversation actor and a
//! retained [`SessionAttachment`] per live connection. An actor may exit at
//! any time (idle eviction); the next command for its conversation respawns
//! it and replays the retained attachments before the command is delivered,
//! so callers never observe the eviction.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use huddle_core::HuddleError;
use huddle_core::types::{ConnectionId, ConversationId, SessionAttachment, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::actor::{ActorCommand, ActorDeps, ConversationActor};
use crate::registry::ConnectionHandle;

/// Spawns, tracks, and rehydrates conversation actors.
pub struct ActorManager {
    deps: ActorDeps,
    actors: DashMap<ConversationId, mpsc::Sender<ActorCommand>>,
    attachments: DashMap<ConnectionId, (SessionAttachment, ConnectionHandle)>,
}

impl ActorManager {
    pub fn new(deps: ActorDeps) -> Self {
        Self {
            deps,
            actors: DashMap::new(),
            attachments: DashMap::new(),
        }
    }

    /// Register a connection with its conversation's actor.
    ///
    /// The attachment is retained until [`detach`](Self::detach) so the
    /// registry can be rebuilt after an eviction.
    pub async fn attach(
        &self,
        conn_id: ConnectionId,
        attachment: SessionAttachment,
        handle: ConnectionHandle,
    ) {
        let conversation_id = attachment.conversation_id.clone();
        self.attachments
            .insert(conn_id.clone(), (attachment.clone(), handle.clone()));
        // A spawn replays every retained attachment for the conversation,
        // including the one just inserted; only send an explicit Attach when
        // the actor already existed.
        let (tx, spawned) = self.ensure_actor(&conversation_id);
        if !spawned
            && tx
                .send(ActorCommand::Attach {
                    conn_id: conn_id.clone(),
                    attachment,
                    handle,
                })
                .await
                .is_err()
        {
            // Raced with an eviction; respawn picks the attachment up.
            self.actors.remove(&conversation_id);
            self.ensure_actor(&conversation_id);
        }
    }

    /// Drop a connection's retained attachment and deregister it from the
    /// actor, if one is live.
    pub async fn detach(&self, conn_id: &ConnectionId) {
        if let Some((_, (attachment, _))) = self.attachments.remove(conn_id) {
            if let Some(tx) = self
                .actors
                .get(&attachment.conversation_id)
                .map(|entry| entry.value().clone())
            {
                let _ = tx
                    .send(ActorCommand::Detach {
                        conn_id: conn_id.clone(),
                    })
                    .await;
            }
        }
    }

    /// Deliver one command to the conversation's actor, spawning or
    /// respawning it as needed.
    pub async fn dispatch(
        &self,
        conversation_id: &ConversationId,
        command: ActorCommand,
    ) -> Result<(), HuddleError> {
        let mut command = command;
        // Two attempts: the actor can evict between lookup and send.
        for _ in 0..2 {
            let (tx, _) = self.ensure_actor(conversation_id);
            match tx.send(command).await {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(returned)) => {
                    debug!(conversation = %conversation_id, "actor mailbox closed, respawning");
                    self.actors.remove(conversation_id);
                    command = returned;
                }
            }
        }
        warn!(conversation = %conversation_id, "actor unavailable after respawn");
        Err(HuddleError::ActorUnavailable(conversation_id.0.clone()))
    }

    /// Online users for a conversation, for the health surface and tests.
    pub async fn list_online(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(conversation_id, ActorCommand::ListOnline { reply })
            .await?;
        rx.await
            .map_err(|_| HuddleError::ActorUnavailable(conversation_id.0.clone()))
    }

    /// Number of live actors.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Force-evict a conversation's actor. The retained attachments stay, so
    /// the next command rehydrates.
    pub fn evict(&self, conversation_id: &ConversationId) {
        self.actors.remove(conversation_id);
    }

    /// Get or spawn the actor. Returns the mailbox sender and whether a new
    /// actor was spawned (and therefore already replayed attachments).
    ///
    /// A fresh actor's sender is published in `actors` only after the replay
    /// `Attach`s are queued, so no concurrent dispatch can slip a frame in
    /// ahead of the registry rebuild.
    fn ensure_actor(&self, conversation_id: &ConversationId) -> (mpsc::Sender<ActorCommand>, bool) {
        match self.actors.entry(conversation_id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    let tx = self.spawn_rehydrated(conversation_id);
                    entry.insert(tx.clone());
                    (tx, true)
                } else {
                    (entry.get().clone(), false)
                }
            }
            Entry::Vacant(entry) => {
                let tx = self.spawn_rehydrated(conversation_id);
                entry.insert(tx.clone());
                (tx, true)
            }
        }
    }

    /// Spawn a fresh actor and queue the registry rebuild from retained
    /// attachments, in attachment order, into its still-private mailbox.
    fn spawn_rehydrated(&self, conversation_id: &ConversationId) -> mpsc::Sender<ActorCommand> {
        let tx = ConversationActor::spawn(conversation_id.clone(), self.deps.clone());
        let mut retained: Vec<(ConnectionId, SessionAttachment, ConnectionHandle)> = self
            .attachments
            .iter()
            .filter(|entry| entry.value().0.conversation_id == *conversation_id)
            .map(|entry| {
                let (attachment, handle) = entry.value().clone();
                (entry.key().clone(), attachment, handle)
            })
            .collect();
        retained.sort_by(|a, b| a.1.connected_at.cmp(&b.1.connected_at));
        for (conn_id, attachment, handle) in retained {
            // Nobody else holds this sender yet, so the mailbox can only
            // fill past capacity with an absurd number of attachments.
            if let Err(e) = tx.try_send(ActorCommand::Attach {
                conn_id,
                attachment,
                handle,
            }) {
                warn!(conversation = %conversation_id, error = %e, "attachment replay dropped");
                break;
            }
        }
        tx
    }
}
