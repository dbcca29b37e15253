// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent workflow persistence. At most one active workflow per conversation;
//! the planner upserts the full state after every step so a workflow can
//! always be resumed from its last completed step.

use huddle_core::HuddleError;
use huddle_core::types::ConversationId;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::WorkflowRecord;

fn row_to_workflow(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowRecord> {
    Ok(WorkflowRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        goal: row.get(3)?,
        current_step: row.get(4)?,
        state_json: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert or replace the workflow row for a conversation.
pub async fn upsert_workflow(db: &Database, record: &WorkflowRecord) -> Result<(), HuddleError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agent_workflows
                     (id, conversation_id, user_id, goal, current_step, state_json,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (conversation_id) DO UPDATE SET
                     id = excluded.id,
                     user_id = excluded.user_id,
                     goal = excluded.goal,
                     current_step = excluded.current_step,
                     state_json = excluded.state_json,
                     updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.conversation_id,
                    record.user_id,
                    record.goal,
                    record.current_step,
                    record.state_json,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the workflow for a conversation, if any.
pub async fn get_workflow(
    db: &Database,
    conversation_id: &ConversationId,
) -> Result<Option<WorkflowRecord>, HuddleError> {
    let conversation_id = conversation_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, user_id, goal, current_step, state_json,
                        created_at, updated_at
                 FROM agent_workflows WHERE conversation_id = ?1",
            )?;
            let mut rows = stmt.query_map(params![conversation_id], row_to_workflow)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Delete the workflow for a conversation (superseded or terminal state).
pub async fn delete_workflow(
    db: &Database,
    conversation_id: &ConversationId,
) -> Result<(), HuddleError> {
    let conversation_id = conversation_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM agent_workflows WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
