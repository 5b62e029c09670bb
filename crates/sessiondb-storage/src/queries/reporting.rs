// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only projections for the reporting surface.
//!
//! Summaries are computed in SQL with `json_each`/`json_array_length` so a
//! listing never materializes message histories.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use sessiondb_core::{timestamp, MetadataValue, SessionDbError, SessionDbResult};

use super::table;
use crate::models::{MetadataFilter, SessionSummary};
use crate::paths;

/// Session summaries, most recently updated first.
pub fn list_session_summaries(
    conn: &Connection,
    collection: &str,
    offset: u64,
    limit: u64,
    filter: &MetadataFilter,
) -> SessionDbResult<Vec<SessionSummary>> {
    let (clause, mut args) = filter_clause(filter)?;
    args.push(Value::Integer(limit as i64));
    let limit_param = args.len();
    args.push(Value::Integer(offset as i64));
    let offset_param = args.len();

    let sql = format!(
        "SELECT s.session_id,
                json_extract(s.document, '$.session_type'),
                json_extract(s.document, '{created}'),
                json_extract(s.document, '{updated}'),
                json_extract(s.document, '{metadata}'),
                (SELECT COUNT(*) FROM json_each(s.document, '{agents}')),
                (SELECT COALESCE(SUM(json_array_length(a.value, '$.messages')), 0)
                   FROM json_each(s.document, '{agents}') AS a),
                COALESCE(json_array_length(s.document, '{feedbacks}'), 0)
         FROM {t} AS s
         {clause}
         ORDER BY json_extract(s.document, '{updated}') DESC, s.session_id
         LIMIT ?{limit_param} OFFSET ?{offset_param}",
        created = paths::CREATED_AT,
        updated = paths::UPDATED_AT,
        metadata = paths::METADATA,
        agents = paths::AGENTS,
        feedbacks = paths::FEEDBACKS,
        t = table(collection),
    );

    let mut stmt = conn.prepare(&sql).map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })
        .map_err(SessionDbError::storage)?;

    let mut summaries = Vec::new();
    for row in rows {
        let (session_id, session_type, created, updated, metadata, agents, messages, feedbacks) =
            row.map_err(SessionDbError::storage)?;
        summaries.push(SessionSummary {
            session_id,
            session_type: session_type.unwrap_or_default(),
            created_at: timestamp::parse(&created).map_err(SessionDbError::storage)?,
            updated_at: timestamp::parse(&updated).map_err(SessionDbError::storage)?,
            metadata: match metadata {
                Some(json) => serde_json::from_str(&json)?,
                None => Default::default(),
            },
            agents_count: agents as u64,
            messages_count: messages as u64,
            feedbacks_count: feedbacks as u64,
        });
    }
    Ok(summaries)
}

/// Number of sessions matching `filter`.
pub fn count_sessions(conn: &Connection, collection: &str, filter: &MetadataFilter) -> SessionDbResult<u64> {
    let (clause, args) = filter_clause(filter)?;
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {} AS s {clause}", table(collection)),
            params_from_iter(args),
            |row| row.get(0),
        )
        .map_err(SessionDbError::storage)?;
    Ok(count as u64)
}

/// Distinct metadata keys across the `sample_limit` most recently updated sessions.
pub fn metadata_keys(conn: &Connection, collection: &str, sample_limit: u64) -> SessionDbResult<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT DISTINCT k.key
             FROM (SELECT document FROM {} ORDER BY json_extract(document, '{}') DESC LIMIT ?1) AS s,
                  json_each(s.document, '{}') AS k
             ORDER BY k.key",
            table(collection),
            paths::UPDATED_AT,
            paths::METADATA,
        ))
        .map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map([sample_limit as i64], |row| row.get(0))
        .map_err(SessionDbError::storage)?;
    rows.collect::<Result<Vec<String>, _>>()
        .map_err(SessionDbError::storage)
}

/// Non-null values of `metadata.<field>` across up to `sample_limit` sessions.
pub fn metadata_field_values(
    conn: &Connection,
    collection: &str,
    field: &str,
    sample_limit: u64,
) -> SessionDbResult<Vec<MetadataValue>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT json_type(document, ?1), json_extract(document, ?1)
             FROM {}
             WHERE json_type(document, ?1) IS NOT NULL AND json_type(document, ?1) != 'null'
             ORDER BY json_extract(document, '{}') DESC
             LIMIT ?2",
            table(collection),
            paths::UPDATED_AT,
        ))
        .map_err(SessionDbError::storage)?;
    let rows = stmt
        .query_map(
            rusqlite::params![paths::metadata_key(field), sample_limit as i64],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?)),
        )
        .map_err(SessionDbError::storage)?;

    let mut values = Vec::new();
    for row in rows {
        let (kind, raw) = row.map_err(SessionDbError::storage)?;
        let value = match (kind.as_str(), raw) {
            ("true", _) => MetadataValue::Bool(true),
            ("false", _) => MetadataValue::Bool(false),
            (_, Value::Integer(i)) => MetadataValue::Integer(i),
            (_, Value::Real(f)) => MetadataValue::Float(f),
            ("text", Value::Text(s)) => MetadataValue::Text(s),
            (_, Value::Text(json)) => serde_json::from_str(&json)?,
            _ => continue,
        };
        values.push(value);
    }
    Ok(values)
}

/// `WHERE` clause and bound values for a metadata equality filter.
fn filter_clause(filter: &MetadataFilter) -> SessionDbResult<(String, Vec<Value>)> {
    if filter.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut args = Vec::new();
    let mut conditions = Vec::new();
    for (key, value) in filter.conditions() {
        paths::validate_identifier("metadata key", key)?;
        args.push(Value::Text(paths::metadata_key(key)));
        let path = args.len();
        let condition = match value {
            MetadataValue::Null => format!("json_type(s.document, ?{path}) = 'null'"),
            MetadataValue::Bool(b) => {
                format!("json_type(s.document, ?{path}) = '{b}'")
            }
            MetadataValue::Integer(i) => {
                args.push(Value::Integer(*i));
                format!("json_extract(s.document, ?{path}) = ?{}", args.len())
            }
            MetadataValue::Float(f) => {
                args.push(Value::Real(*f));
                format!("json_extract(s.document, ?{path}) = ?{}", args.len())
            }
            MetadataValue::Text(s) => {
                args.push(Value::Text(s.clone()));
                format!(
                    "json_type(s.document, ?{path}) = 'text' AND json_extract(s.document, ?{path}) = ?{}",
                    args.len()
                )
            }
            MetadataValue::List(_) | MetadataValue::Map(_) => {
                args.push(Value::Text(value.to_json()?));
                format!(
                    "json_extract(s.document, ?{path}) = json(?{})",
                    args.len()
                )
            }
        };
        conditions.push(condition);
    }
    Ok((format!("WHERE {}", conditions.join(" AND ")), args))
}
