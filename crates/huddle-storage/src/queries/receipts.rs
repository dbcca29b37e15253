// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read receipt operations. One row per (message, user), upsert semantics.

use huddle_core::HuddleError;
use huddle_core::types::{MessageId, ReadReceipt, UserId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Record that `user_id` read `message_id`. Idempotent: a repeat mark-read
/// updates `read_at` in place (last write wins), never duplicates the row.
pub async fn upsert_receipt(
    db: &Database,
    message_id: &MessageId,
    user_id: &UserId,
    read_at: &str,
) -> Result<(), HuddleError> {
    let message_id = message_id.0.clone();
    let user_id = user_id.0.clone();
    let read_at = read_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO read_receipts (message_id, user_id, read_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (message_id, user_id) DO UPDATE SET read_at = excluded.read_at",
                params![message_id, user_id, read_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All receipts for a message, ordered by reader for stable output.
pub async fn get_receipts_for_message(
    db: &Database,
    message_id: &MessageId,
) -> Result<Vec<ReadReceipt>, HuddleError> {
    let message_id = message_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, user_id, read_at FROM read_receipts
                 WHERE message_id = ?1 ORDER BY user_id",
            )?;
            let rows = stmt.query_map(params![message_id], |row| {
                Ok(ReadReceipt {
                    message_id: MessageId(row.get(0)?),
                    user_id: UserId(row.get(1)?),
                    read_at: row.get(2)?,
                })
            })?;
            let mut receipts = Vec::new();
            for row in rows {
                receipts.push(row?);
            }
            Ok(receipts)
        })
        .await
        .map_err(map_tr_err)
}
