// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent sub-document writes and reads.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use sessiondb_core::{AgentData, SessionAgent, SessionDbError, SessionDbResult};

use super::{now_string, table};
use crate::paths;

/// Write `agents.<agent_id>.agent_data`, creating the agent on first use.
///
/// Inside one IMMEDIATE transaction the agent's `created_at` alone is read
/// and then written back with the new data, so repeated syncs never reset
/// it. A missing `created_at` (first write) defaults to now. Returns `false`
/// when the session does not exist.
pub fn upsert_agent(
    conn: &mut Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    agent_data: &AgentData,
) -> SessionDbResult<bool> {
    let t = table(collection);
    let created_path = paths::agent_field(agent_id, "created_at");
    let data = serde_json::to_string(agent_data)?;
    let now = now_string();

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(SessionDbError::storage)?;
    let existing: Option<Option<String>> = tx
        .query_row(
            &format!("SELECT json_extract(document, ?2) FROM {t} WHERE session_id = ?1"),
            params![session_id, created_path],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    let Some(created_at) = existing else {
        return Ok(false);
    };
    let created_at = created_at.unwrap_or_else(|| now.clone());

    let stub = serde_json::json!({
        "agent_id": agent_id,
        "agent_data": {},
        "messages": [],
        "created_at": created_at,
        "updated_at": now,
    })
    .to_string();

    tx.execute(
        &format!(
            "UPDATE {t} SET document = json_set(
                 json_insert(document, ?2, json(?3)),
                 ?4, json(?5),
                 ?6, ?7,
                 ?8, ?9,
                 '{}', ?9)
             WHERE session_id = ?1",
            paths::UPDATED_AT
        ),
        params![
            session_id,
            paths::agent(agent_id),
            stub,
            paths::agent_field(agent_id, "agent_data"),
            data,
            created_path,
            created_at,
            paths::agent_field(agent_id, "updated_at"),
            now,
        ],
    )
    .map_err(SessionDbError::storage)?;
    tx.commit().map_err(SessionDbError::storage)?;
    Ok(true)
}

/// Read an agent's data and timestamps without its message history.
pub fn read_agent(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
) -> SessionDbResult<Option<SessionAgent>> {
    let stored: Option<Option<String>> = conn
        .query_row(
            &format!(
                "SELECT json_remove(json_extract(document, ?2), '$.messages')
                 FROM {} WHERE session_id = ?1",
                table(collection)
            ),
            params![session_id, paths::agent(agent_id)],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    match stored.flatten() {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Ids of every agent in a session, in key order.
pub fn agent_ids(conn: &Connection, collection: &str, session_id: &str) -> SessionDbResult<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT a.key FROM {} AS s, json_each(s.document, '{}') AS a
             WHERE s.session_id = ?1 ORDER BY a.key",
            table(collection),
            paths::AGENTS
        ))
        .map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map(params![session_id], |row| row.get(0))
        .map_err(SessionDbError::storage)?;
    rows.collect::<Result<Vec<String>, _>>()
        .map_err(SessionDbError::storage)
}
