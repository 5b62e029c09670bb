// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations and per-collection DDL.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!` and run when the client opens. Collection tables are
//! named by configuration, so they are created on first use instead.

use rusqlite::{params, Connection};
use sessiondb_core::{timestamp, SessionDbError, SessionDbResult};
use tracing::{debug, warn};

use crate::paths;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut Connection) -> SessionDbResult<()> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(SessionDbError::connection)?;
    Ok(())
}

/// Create the collection table if it does not exist and record it in the registry.
pub fn ensure_collection(conn: &Connection, collection: &str) -> SessionDbResult<()> {
    paths::validate_collection(collection)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{collection}\" (
             session_id TEXT PRIMARY KEY NOT NULL,
             document TEXT NOT NULL CHECK (json_valid(document))
         );"
    ))
    .map_err(SessionDbError::storage)?;
    let registered = conn
        .execute(
            "INSERT OR IGNORE INTO sessiondb_collections (name, created_at) VALUES (?1, ?2)",
            params![collection, timestamp::format(&timestamp::now())],
        )
        .map_err(SessionDbError::storage)?;
    if registered > 0 {
        debug!(collection, "created session collection");
    }
    Ok(())
}

/// Create the timestamp and metadata expression indexes for a collection.
///
/// Index creation is best effort: a failure is logged and skipped, and the
/// number of indexes that could be ensured is returned.
pub fn ensure_indexes(conn: &Connection, collection: &str, indexed_fields: &[String]) -> usize {
    let mut statements = vec![
        (
            format!("{collection}_created_at"),
            paths::CREATED_AT.to_string(),
        ),
        (
            format!("{collection}_updated_at"),
            paths::UPDATED_AT.to_string(),
        ),
    ];
    for field in indexed_fields {
        if let Err(e) = paths::validate_identifier("indexed field", field) {
            warn!(collection, field = %field, error = %e, "skipping metadata index");
            continue;
        }
        statements.push((
            format!("{collection}_meta_{}", index_suffix(field)),
            paths::metadata_key(field),
        ));
    }

    let mut ensured = 0;
    for (name, path) in statements {
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS \"{name}\" ON \"{collection}\" (json_extract(document, '{}'))",
            path.replace('\'', "''")
        );
        match conn.execute_batch(&sql) {
            Ok(()) => ensured += 1,
            Err(e) => warn!(collection, index = %name, error = %e, "failed to create index"),
        }
    }
    ensured
}

/// Collection names recorded in the registry, oldest first.
pub fn list_collections(conn: &Connection) -> SessionDbResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sessiondb_collections ORDER BY created_at, name")
        .map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .map_err(SessionDbError::storage)?;
    rows.collect::<Result<Vec<String>, _>>()
        .map_err(SessionDbError::storage)
}

fn index_suffix(field: &str) -> String {
    field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
