// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp-derived message IDs.
//!
//! A message ID is `{unix_millis:013}-{seq:06}-{rand}`: a zero-padded
//! millisecond timestamp, a process-wide monotonic sequence that breaks ties
//! within one millisecond, and a short random suffix for global uniqueness.
//! Lexicographic order over IDs equals creation order within a process,
//! which is what the per-conversation ordering invariant requires given that
//! all appends for one conversation go through one actor.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::types::MessageId;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh message ID for the given creation instant.
pub fn generate_message_id(now: chrono::DateTime<chrono::Utc>) -> MessageId {
    let millis = now.timestamp_millis().max(0) as u64;
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    let suffix: u32 = rand::thread_rng().r#gen();
    MessageId(format!("{millis:013}-{seq:06}-{suffix:08x}"))
}

/// Generate a fresh message ID at the current instant.
pub fn new_message_id() -> MessageId {
    generate_message_id(chrono::Utc::now())
}
