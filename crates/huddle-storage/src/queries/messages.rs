// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.
//!
//! The message log is append-only per conversation; rows are immutable after
//! insert except `status`/`updated_at`, and the status update is guarded so
//! it can only move forward (sent -> delivered -> read).

use huddle_core::HuddleError;
use huddle_core::types::{ConversationId, Message, MessageId, MessageStatus, UserId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, kind, status, \
                               media_url, media_type, media_size, created_at, updated_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let kind: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Message {
        id: MessageId(row.get(0)?),
        conversation_id: ConversationId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        content: row.get(3)?,
        kind: kind.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        status: status.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        media_url: row.get(6)?,
        media_type: row.get(7)?,
        media_size: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Append a message to the log. This is the first effect of the send
/// handler: the row is durable before any broadcast or notification.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), HuddleError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, kind, status,
                                       media_url, media_type, media_size, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    msg.id.0,
                    msg.conversation_id.0,
                    msg.sender_id.0,
                    msg.content,
                    msg.kind.to_string(),
                    msg.status.to_string(),
                    msg.media_url,
                    msg.media_type,
                    msg.media_size,
                    msg.created_at,
                    msg.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single message by ID.
pub async fn get_message(db: &Database, id: &MessageId) -> Result<Option<Message>, HuddleError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_message)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one history page: the `limit` most recent messages created strictly
/// before the `before` message (when given), returned oldest -> newest.
///
/// Internally fetched newest -> oldest and reversed. An unknown `before` ID
/// is treated as no cursor. `has_more` is signaled by the caller comparing
/// the returned length against `limit`.
pub async fn get_page(
    db: &Database,
    conversation_id: &ConversationId,
    limit: usize,
    before: Option<&MessageId>,
) -> Result<Vec<Message>, HuddleError> {
    let conversation_id = conversation_id.0.clone();
    let before = before.map(|id| id.0.clone());
    db.connection()
        .call(move |conn| {
            // Resolve the cursor to the referenced message's creation time.
            let cursor: Option<(String, String)> = match before {
                Some(id) => conn
                    .query_row(
                        "SELECT created_at FROM messages WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .map(|created_at: String| Some((id, created_at)))
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?,
                None => None,
            };

            let mut messages = Vec::new();
            match cursor {
                // Composite cursor: timestamps have millisecond precision,
                // so a burst of sends can share one. The ID breaks the tie.
                Some((cursor_id, cursor_at)) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE conversation_id = ?1
                           AND (created_at < ?2 OR (created_at = ?2 AND id < ?3))
                         ORDER BY created_at DESC, id DESC LIMIT ?4"
                    ))?;
                    let rows = stmt.query_map(
                        params![conversation_id, cursor_at, cursor_id, limit as i64],
                        row_to_message,
                    )?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY created_at DESC, id DESC LIMIT ?2"
                    ))?;
                    let rows =
                        stmt.query_map(params![conversation_id, limit as i64], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Advance a message's status. Returns `true` when the row changed.
///
/// The update is guarded in SQL so a stale write can never regress a status
/// another path already upgraded.
pub async fn update_status(
    db: &Database,
    id: &MessageId,
    status: MessageStatus,
    updated_at: &str,
) -> Result<bool, HuddleError> {
    let id = id.0.clone();
    let status = status.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = ?2, updated_at = ?3
                 WHERE id = ?1
                   AND (CASE status WHEN 'sent' THEN 0 WHEN 'delivered' THEN 1 ELSE 2 END)
                     < (CASE ?2 WHEN 'sent' THEN 0 WHEN 'delivered' THEN 1 ELSE 2 END)",
                params![id, status, updated_at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Retroactively mark a batch of still-`sent` messages delivered (history
/// retrieval upgrade path). Returns the IDs that actually changed.
pub async fn mark_delivered_batch(
    db: &Database,
    ids: Vec<MessageId>,
    updated_at: &str,
) -> Result<Vec<MessageId>, HuddleError> {
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            let mut upgraded = Vec::new();
            for id in ids {
                let changed = conn.execute(
                    "UPDATE messages SET status = 'delivered', updated_at = ?2
                     WHERE id = ?1 AND status = 'sent'",
                    params![id.0, updated_at],
                )?;
                if changed > 0 {
                    upgraded.push(id);
                }
            }
            Ok(upgraded)
        })
        .await
        .map_err(map_tr_err)
}
