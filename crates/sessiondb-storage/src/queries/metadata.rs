// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field-level metadata writes and the projected metadata read.
//!
//! Writes never read the document first: each patch becomes one `UPDATE`
//! whose `json_set`/`json_remove` call names every affected key, so all keys
//! land together and concurrent patches to disjoint keys cannot lose each
//! other's changes.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use sessiondb_core::{Metadata, SessionDbError, SessionDbResult};

use super::{now_string, table};
use crate::paths;

/// Set every key of `patch` under `metadata` in one statement.
///
/// Returns `false` when the session does not exist.
pub fn update_metadata(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    patch: &Metadata,
) -> SessionDbResult<bool> {
    let mut args = vec![session_id.to_string()];
    let mut pairs = Vec::with_capacity(patch.len());
    for (key, value) in patch {
        args.push(paths::metadata_key(key));
        args.push(value.to_json()?);
        pairs.push(format!("?{}, json(?{})", args.len() - 1, args.len()));
    }
    args.push(now_string());
    let now = args.len();

    let sql = format!(
        "UPDATE {} SET document = json_set(document, {}, '{}', ?{now}) WHERE session_id = ?1",
        table(collection),
        pairs.join(", "),
        paths::UPDATED_AT,
    );
    let changed = conn
        .execute(&sql, params_from_iter(args))
        .map_err(SessionDbError::storage)?;
    Ok(changed > 0)
}

/// Remove each of `keys` from `metadata` in one statement.
///
/// Keys that are not present are ignored. Returns `false` when the session
/// does not exist.
pub fn delete_metadata(
    conn: &Connection,
    collection: &str,
    session_id: &str,
    keys: &[String],
) -> SessionDbResult<bool> {
    let mut args = vec![session_id.to_string()];
    for key in keys {
        args.push(paths::metadata_key(key));
    }
    let placeholders = (2..=args.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    args.push(now_string());
    let now = args.len();

    let sql = format!(
        "UPDATE {} SET document = json_set(json_remove(document, {placeholders}), '{}', ?{now})
         WHERE session_id = ?1",
        table(collection),
        paths::UPDATED_AT,
    );
    let changed = conn
        .execute(&sql, params_from_iter(args))
        .map_err(SessionDbError::storage)?;
    Ok(changed > 0)
}

/// Read only the `metadata` sub-document. An unknown session is `Ok(None)`.
pub fn get_metadata(
    conn: &Connection,
    collection: &str,
    session_id: &str,
) -> SessionDbResult<Option<Metadata>> {
    let stored: Option<Option<String>> = conn
        .query_row(
            &format!(
                "SELECT json_extract(document, '{}') FROM {} WHERE session_id = ?1",
                paths::METADATA,
                table(collection)
            ),
            params![session_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(SessionDbError::storage)?;
    match stored {
        None => Ok(None),
        Some(None) => Ok(Some(Metadata::new())),
        Some(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
    }
}
