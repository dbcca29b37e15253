// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read/delivery reconciliation.
//!
//! Merges a message batch with durably stored last-read timestamps so an
//! offline reader's progress is visible to senders without the reader being
//! connected. A message counts as read when some participant other than its
//! sender has a last-read timestamp at or after the message's creation time.
//! Stored status never regresses, and the scan stops at the first
//! qualifying participant per message.

use std::collections::HashMap;

use huddle_core::types::{Message, MessageStatus, UserId};

/// Upgrade statuses in `messages` in place from the last-read map.
///
/// Participants are visited in sorted user-ID order so the "first match"
/// rule is deterministic. Returns the IDs of messages whose status changed.
pub fn reconcile_statuses(
    messages: &mut [Message],
    last_read: &HashMap<UserId, String>,
) -> Vec<huddle_core::types::MessageId> {
    let mut participants: Vec<(&UserId, &String)> = last_read.iter().collect();
    participants.sort_by(|a, b| a.0.cmp(b.0));

    let mut changed = Vec::new();
    for message in messages.iter_mut() {
        if message.status == MessageStatus::Read {
            continue;
        }
        for (user_id, read_up_to) in &participants {
            if **user_id == message.sender_id {
                continue;
            }
            if read_up_to.as_str() >= message.created_at.as_str() {
                message.status = message.status.advance(MessageStatus::Read);
                changed.push(message.id.clone());
                break;
            }
        }
    }
    changed
}
