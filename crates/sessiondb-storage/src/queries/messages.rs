// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append, targeted rewrites and history reads.
//!
//! `message_id` is assigned inside the appending `UPDATE` from the array as
//! it is at write time, so ids stay unique when several writers append to
//! one session. Rewrites locate the element by `message_id` (never by a
//! cached position) inside an IMMEDIATE transaction and write its original
//! `created_at` back alongside the new fields.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use sessiondb_core::{
    ContentBlock, EventLoopMetrics, Message, MessagePatch, NewMessage, SessionDbError,
    SessionDbResult,
};

use super::{now_string, table};
use crate::paths;

/// Append a message to `agents.<agent_id>.messages`, creating the agent
/// stub if needed, and return the stored message with its assigned id.
///
/// Ids start at 0 and are one more than the highest id already present.
/// Returns `Ok(None)` when the session does not exist.
pub fn append_message(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    message: &NewMessage,
) -> SessionDbResult<Option<Message>> {
    let t = table(collection);
    let now = now_string();
    let body = serde_json::json!({
        "role": message.role,
        "content": message.content,
        "created_at": now,
        "updated_at": now,
    })
    .to_string();
    let stub = serde_json::json!({
        "agent_id": agent_id,
        "agent_data": {},
        "messages": [],
        "created_at": now,
        "updated_at": now,
    })
    .to_string();

    let sql = format!(
        "UPDATE {t} SET document = json_set(
             json_insert(
                 json_insert(document, ?2, json(?3)),
                 ?4,
                 json_set(json(?5), '$.message_id',
                     (SELECT COALESCE(MAX(json_extract(m.value, '$.message_id')), -1) + 1
                      FROM json_each({t}.document, ?6) AS m))),
             ?7, ?8,
             '{}', ?8)
         WHERE session_id = ?1
         RETURNING json_extract(document, ?9)",
        paths::UPDATED_AT
    );
    let stored: Option<String> = conn
        .query_row(
            &sql,
            params![
                session_id,
                paths::agent(agent_id),
                stub,
                paths::messages_append(agent_id),
                body,
                paths::messages(agent_id),
                paths::agent_field(agent_id, "updated_at"),
                now,
                paths::last_message(agent_id),
            ],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    match stored {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Overwrite the content and/or metrics of one message.
///
/// Returns `false` when the session, agent or message does not exist.
pub fn update_message(
    conn: &mut Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    message_id: u64,
    patch: &MessagePatch,
) -> SessionDbResult<bool> {
    let mut fields = Vec::new();
    if let Some(content) = &patch.content {
        fields.push(("content", serde_json::to_string(content)?));
    }
    if let Some(metrics) = &patch.event_loop_metrics {
        fields.push(("event_loop_metrics", serde_json::to_string(metrics)?));
    }
    rewrite_message(conn, collection, session_id, agent_id, message_id, &fields)
}

/// Replace a message's content and mark it redacted, keeping its id,
/// position and `created_at`.
pub fn redact_message(
    conn: &mut Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    message_id: u64,
    replacement: &[ContentBlock],
) -> SessionDbResult<bool> {
    let fields = [
        ("content", serde_json::to_string(replacement)?),
        ("redacted", "true".to_string()),
    ];
    rewrite_message(conn, collection, session_id, agent_id, message_id, &fields)
}

/// Set `fields` (name, JSON text) on the message with `message_id`.
fn rewrite_message(
    conn: &mut Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    message_id: u64,
    fields: &[(&str, String)],
) -> SessionDbResult<bool> {
    let t = table(collection);
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(SessionDbError::storage)?;
    let located: Option<(i64, String)> = tx
        .query_row(
            &format!(
                "SELECT CAST(m.key AS INTEGER), json_extract(m.value, '$.created_at')
                 FROM {t} AS s, json_each(s.document, ?2) AS m
                 WHERE s.session_id = ?1 AND json_extract(m.value, '$.message_id') = ?3"
            ),
            params![session_id, paths::messages(agent_id), message_id as i64],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    let Some((index, created_at)) = located else {
        return Ok(false);
    };

    let now = now_string();
    let mut args: Vec<String> = vec![session_id.to_string()];
    let mut sets = Vec::new();
    for (field, json) in fields {
        args.push(paths::message_field(agent_id, index, field));
        args.push(json.clone());
        sets.push(format!("?{}, json(?{})", args.len() - 1, args.len()));
    }
    args.push(paths::message_field(agent_id, index, "created_at"));
    args.push(created_at);
    sets.push(format!("?{}, ?{}", args.len() - 1, args.len()));
    args.push(paths::message_field(agent_id, index, "updated_at"));
    args.push(now);
    let now_param = args.len();
    sets.push(format!("?{}, ?{now_param}", now_param - 1));
    args.push(paths::agent_field(agent_id, "updated_at"));
    sets.push(format!("?{}, ?{now_param}", args.len()));

    tx.execute(
        &format!(
            "UPDATE {t} SET document = json_set(document, {}, '{}', ?{now_param})
             WHERE session_id = ?1",
            sets.join(", "),
            paths::UPDATED_AT
        ),
        params_from_iter(args),
    )
    .map_err(SessionDbError::storage)?;
    tx.commit().map_err(SessionDbError::storage)?;
    Ok(true)
}

/// One message, metrics stripped.
pub fn read_message(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    message_id: u64,
) -> SessionDbResult<Option<Message>> {
    let stored: Option<String> = conn
        .query_row(
            &format!(
                "SELECT json_remove(m.value, '$.event_loop_metrics')
                 FROM {} AS s, json_each(s.document, ?2) AS m
                 WHERE s.session_id = ?1 AND json_extract(m.value, '$.message_id') = ?3",
                table(collection)
            ),
            params![session_id, paths::messages(agent_id), message_id as i64],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    match stored {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// An agent's messages ordered by `message_id`, metrics stripped.
///
/// `limit: None` returns everything from `offset` on.
pub fn list_messages(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
    limit: Option<usize>,
    offset: usize,
) -> SessionDbResult<Vec<Message>> {
    let limit = limit.map_or(-1, |l| l as i64);
    let mut stmt = conn
        .prepare(&format!(
            "SELECT json_remove(m.value, '$.event_loop_metrics')
             FROM {} AS s, json_each(s.document, ?2) AS m
             WHERE s.session_id = ?1
             ORDER BY json_extract(m.value, '$.message_id')
             LIMIT ?3 OFFSET ?4",
            table(collection)
        ))
        .map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map(
            params![session_id, paths::messages(agent_id), limit, offset as i64],
            |row| row.get::<_, String>(0),
        )
        .map_err(SessionDbError::storage)?;
    let mut messages = Vec::new();
    for row in rows {
        let json = row.map_err(SessionDbError::storage)?;
        messages.push(serde_json::from_str(&json)?);
    }
    Ok(messages)
}

/// The highest `message_id` stored for an agent, if it has any messages.
pub fn last_message_id(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
) -> SessionDbResult<Option<u64>> {
    let max: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT MAX(json_extract(m.value, '$.message_id'))
                 FROM {} AS s, json_each(s.document, ?2) AS m
                 WHERE s.session_id = ?1",
                table(collection)
            ),
            params![session_id, paths::messages(agent_id)],
            |row| row.get(0),
        )
        .map_err(SessionDbError::storage)?;
    Ok(max.map(|id| id as u64))
}

/// `(message_id, metrics)` for every message of an agent, ordered by id.
pub fn message_metrics(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    agent_id: &str,
) -> SessionDbResult<Vec<(u64, Option<EventLoopMetrics>)>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT json_extract(m.value, '$.message_id'),
                    json_extract(m.value, '$.event_loop_metrics')
             FROM {} AS s, json_each(s.document, ?2) AS m
             WHERE s.session_id = ?1
             ORDER BY json_extract(m.value, '$.message_id')",
            table(collection)
        ))
        .map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map(params![session_id, paths::messages(agent_id)], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .map_err(SessionDbError::storage)?;
    let mut out = Vec::new();
    for row in rows {
        let (id, metrics) = row.map_err(SessionDbError::storage)?;
        let metrics = metrics.map(|json| serde_json::from_str(&json)).transpose()?;
        out.push((id as u64, metrics));
    }
    Ok(out)
}
