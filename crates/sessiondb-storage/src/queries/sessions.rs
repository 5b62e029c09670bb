// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole-document session operations.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use sessiondb_core::{Metadata, Session, SessionDbError, SessionDbResult};

use super::table;

/// Insert a new session document unless one already exists, then return
/// whichever document is stored.
///
/// First write wins: when the id is taken, the stored document is returned
/// unchanged and the supplied type and metadata are discarded. The second
/// element of the tuple is `true` when this call created the document.
pub fn create_session(
    conn: &mut Connection,
    collection: &str,
    session_id: &str,
    session_type: &str,
    metadata: Metadata,
) -> SessionDbResult<(Session, bool)> {
    let fresh = Session::new(session_id, session_type, metadata);
    let document = serde_json::to_string(&fresh)?;
    let t = table(collection);

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(SessionDbError::storage)?;
    let inserted = tx
        .execute(
            &format!(
                "INSERT INTO {t} (session_id, document) VALUES (?1, ?2)
                 ON CONFLICT(session_id) DO NOTHING"
            ),
            params![session_id, document],
        )
        .map_err(SessionDbError::storage)?;
    let session = if inserted == 1 {
        fresh
    } else {
        let stored: String = tx
            .query_row(
                &format!("SELECT document FROM {t} WHERE session_id = ?1"),
                params![session_id],
                |row| row.get(0),
            )
            .map_err(SessionDbError::storage)?;
        serde_json::from_str(&stored)?
    };
    tx.commit().map_err(SessionDbError::storage)?;
    Ok((session, inserted == 1))
}

/// Fetch one session document. An unknown id is `Ok(None)`.
pub fn read_session(
    conn: &Connection,
    collection: &str,
    session_id: &str,
) -> SessionDbResult<Option<Session>> {
    let stored: Option<String> = conn
        .query_row(
            &format!("SELECT document FROM {} WHERE session_id = ?1", table(collection)),
            params![session_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    match stored {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn session_exists(conn: &Connection, collection: &str, session_id: &str) -> SessionDbResult<bool> {
    conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE session_id = ?1)",
            table(collection)
        ),
        params![session_id],
        |row| row.get(0),
    )
    .map_err(SessionDbError::storage)
}

/// Remove a whole session. Returns whether a document was removed.
pub fn delete_session(conn: &Connection, collection: &str, session_id: &str) -> SessionDbResult<bool> {
    let removed = conn
        .execute(
            &format!("DELETE FROM {} WHERE session_id = ?1", table(collection)),
            params![session_id],
        )
        .map_err(SessionDbError::storage)?;
    Ok(removed > 0)
}
