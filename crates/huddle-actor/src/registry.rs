// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session registry for one conversation.
//!
//! Maps live connection handles to identity. Owned exclusively by the
//! conversation actor; never shared across actors. The map is rebuilt from
//! per-connection retained attachments after an eviction, so nothing here is
//! load-bearing across that boundary.
//!
//! Every outbound send is fire-and-forget: a failed send removes the handle
//! from the registry and never aborts processing for other handles.

use std::collections::HashMap;

use huddle_core::types::{ConnectionId, UserId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{PresenceStatus, ServerFrame};

/// Sender half of one connection's outbound frame channel.
pub type ConnectionHandle = mpsc::UnboundedSender<ServerFrame>;

struct SessionEntry {
    user_id: UserId,
    handle: ConnectionHandle,
    #[allow(dead_code)]
    connected_at: String,
}

/// Registry of live connections for one conversation.
///
/// Multiple connections for the same user are allowed (distinct handles);
/// a user is online iff at least one of their handles is registered.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and announce presence to everyone else.
    ///
    /// Returns the deduplicated set of online users after registration,
    /// which the caller sends back to the new connection as `connected`.
    pub fn register(
        &mut self,
        conn_id: ConnectionId,
        user_id: UserId,
        connected_at: String,
        handle: ConnectionHandle,
    ) -> Vec<UserId> {
        let presence = ServerFrame::PresenceUpdate {
            user_id: user_id.clone(),
            status: PresenceStatus::Online,
        };
        self.sessions.insert(
            conn_id.clone(),
            SessionEntry {
                user_id,
                handle,
                connected_at,
            },
        );
        self.broadcast_except(Some(&conn_id), &presence);
        self.list_online()
    }

    /// Remove a connection. Returns the number of remaining connections.
    ///
    /// Emits `presence_update: offline` only when the departing user has no
    /// other handle left, so multi-device users do not flap.
    pub fn unregister(&mut self, conn_id: &ConnectionId) -> usize {
        if let Some(entry) = self.sessions.remove(conn_id) {
            let still_online = self
                .sessions
                .values()
                .any(|other| other.user_id == entry.user_id);
            if !still_online {
                self.broadcast_except(
                    None,
                    &ServerFrame::PresenceUpdate {
                        user_id: entry.user_id,
                        status: PresenceStatus::Offline,
                    },
                );
            }
        }
        self.sessions.len()
    }

    /// Deduplicated online users, sorted for stable output.
    pub fn list_online(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .sessions
            .values()
            .map(|entry| entry.user_id.clone())
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Whether the user has at least one live handle.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.sessions.values().any(|entry| entry.user_id == *user_id)
    }

    /// Number of live connection handles.
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// The user behind a connection, if registered.
    pub fn user_for(&self, conn_id: &ConnectionId) -> Option<&UserId> {
        self.sessions.get(conn_id).map(|entry| &entry.user_id)
    }

    /// Send one frame to one connection. A failed send drops the handle.
    pub fn send_to(&mut self, conn_id: &ConnectionId, frame: &ServerFrame) {
        let failed = match self.sessions.get(conn_id) {
            Some(entry) => entry.handle.send(frame.clone()).is_err(),
            None => false,
        };
        if failed {
            debug!(%conn_id, "dropping dead connection handle");
            self.sessions.remove(conn_id);
        }
    }

    /// Fan one frame out to every handle except an optional excluded
    /// connection. Returns how many handles belonging to users *other than*
    /// `excluding_user` were reached.
    pub fn fan_out(
        &mut self,
        frame: &ServerFrame,
        exclude_conn: Option<&ConnectionId>,
        excluding_user: Option<&UserId>,
    ) -> usize {
        let mut reached_others = 0;
        let mut dead = Vec::new();
        for (conn_id, entry) in &self.sessions {
            if Some(conn_id) == exclude_conn {
                continue;
            }
            if entry.handle.send(frame.clone()).is_err() {
                dead.push(conn_id.clone());
                continue;
            }
            if excluding_user.map_or(true, |user| entry.user_id != *user) {
                reached_others += 1;
            }
        }
        for conn_id in dead {
            debug!(%conn_id, "dropping dead connection handle");
            self.sessions.remove(&conn_id);
        }
        reached_others
    }

    /// Broadcast to every handle except one connection.
    pub fn broadcast_except(&mut self, exclude: Option<&ConnectionId>, frame: &ServerFrame) {
        self.fan_out(frame, exclude, None);
    }

    /// Broadcast to every handle.
    pub fn broadcast(&mut self, frame: &ServerFrame) {
        self.fan_out(frame, None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn sink() -> (ConnectionHandle, UnboundedReceiver<ServerFrame>) {
        mpsc::unbounded_channel()
    }

    fn conn(id: &str) -> ConnectionId {
        ConnectionId(id.to_string())
    }

    fn user(id: &str) -> UserId {
        UserId(id.to_string())
    }

    #[test]
    fn register_returns_online_users_and_announces_presence() {
        let mut registry = SessionRegistry::new();
        let (h1, mut rx1) = sink();
        let (h2, _rx2) = sink();

        let online = registry.register(conn("c1"), user("alice"), "t0".into(), h1);
        assert_eq!(online, vec![user("alice")]);

        let online = registry.register(conn("c2"), user("bob"), "t1".into(), h2);
        assert_eq!(online, vec![user("alice"), user("bob")]);

        // alice's connection saw bob come online; bob's own did not.
        match rx1.try_recv().unwrap() {
            ServerFrame::PresenceUpdate { user_id, status } => {
                assert_eq!(user_id, user("bob"));
                assert_eq!(status, PresenceStatus::Online);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn user_with_two_handles_stays_online_until_last_leaves() {
        let mut registry = SessionRegistry::new();
        let (h1, _rx1) = sink();
        let (h2, _rx2) = sink();
        let (h3, mut rx3) = sink();

        registry.register(conn("c1"), user("alice"), "t0".into(), h1);
        registry.register(conn("c2"), user("alice"), "t1".into(), h2);
        registry.register(conn("c3"), user("bob"), "t2".into(), h3);
        // Drain bob's presence traffic from the registrations.
        while rx3.try_recv().is_ok() {}

        let remaining = registry.unregister(&conn("c1"));
        assert_eq!(remaining, 2);
        assert!(registry.is_online(&user("alice")));
        // No offline event yet: alice still has c2.
        assert!(rx3.try_recv().is_err());

        registry.unregister(&conn("c2"));
        assert!(!registry.is_online(&user("alice")));
        match rx3.try_recv().unwrap() {
            ServerFrame::PresenceUpdate { user_id, status } => {
                assert_eq!(user_id, user("alice"));
                assert_eq!(status, PresenceStatus::Offline);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn failed_send_drops_the_handle_and_continues() {
        let mut registry = SessionRegistry::new();
        let (h1, rx1) = sink();
        let (h2, mut rx2) = sink();
        registry.register(conn("c1"), user("alice"), "t0".into(), h1);
        registry.register(conn("c2"), user("bob"), "t1".into(), h2);
        while rx2.try_recv().is_ok() {}

        drop(rx1); // alice's socket died

        let reached = registry.fan_out(
            &ServerFrame::Typing {
                user_id: user("bob"),
                is_typing: true,
            },
            None,
            Some(&user("bob")),
        );
        // bob's own handle doesn't count as an "other" recipient, and
        // alice's dead handle was dropped rather than erroring out.
        assert_eq!(reached, 0);
        assert_eq!(registry.connection_count(), 1);
        assert!(!registry.is_online(&user("alice")));
    }

    #[test]
    fn fan_out_counts_only_other_users_handles() {
        let mut registry = SessionRegistry::new();
        let (h1, _rx1) = sink();
        let (h2, _rx2) = sink();
        let (h3, _rx3) = sink();
        registry.register(conn("c1"), user("alice"), "t0".into(), h1);
        registry.register(conn("c2"), user("bob"), "t1".into(), h2);
        registry.register(conn("c3"), user("bob"), "t2".into(), h3);

        let reached = registry.fan_out(
            &ServerFrame::Typing {
                user_id: user("alice"),
                is_typing: true,
            },
            Some(&conn("c1")),
            Some(&user("alice")),
        );
        assert_eq!(reached, 2);
    }
}
