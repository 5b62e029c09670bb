// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only session feedback.

use rusqlite::{params, Connection, OptionalExtension};
use sessiondb_core::{timestamp, Feedback, Rating, SessionDbError, SessionDbResult};

use super::table;
use crate::paths;

/// Append a feedback entry stamped with the current time.
///
/// Returns the stored entry, or `Ok(None)` when the session does not exist.
pub fn add_feedback(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    rating: Option<Rating>,
    comment: Option<String>,
) -> SessionDbResult<Option<Feedback>> {
    let feedback = Feedback {
        rating,
        comment,
        created_at: timestamp::now(),
    };
    let json = serde_json::to_string(&feedback)?;
    let changed = conn
        .execute(
            &format!(
                "UPDATE {} SET document = json_set(
                     json_insert(document, '{}', json(?2)),
                     '{}', ?3)
                 WHERE session_id = ?1",
                table(collection),
                paths::FEEDBACKS_APPEND,
                paths::UPDATED_AT,
            ),
            params![session_id, json, timestamp::format(&feedback.created_at)],
        )
        .map_err(SessionDbError::storage)?;
    Ok((changed > 0).then_some(feedback))
}

/// Every feedback entry in append order. An unknown session has none.
pub fn get_feedbacks(conn: &Connection, collection: &str, session_id: &str) -> SessionDbResult<Vec<Feedback>> {
    let stored: Option<Option<String>> = conn
        .query_row(
            &format!(
                "SELECT json_extract(document, '{}') FROM {} WHERE session_id = ?1",
                paths::FEEDBACKS,
                table(collection)
            ),
            params![session_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    match stored.flatten() {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}
