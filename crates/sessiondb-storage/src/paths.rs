// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON path construction and identifier validation.
//!
//! Every path handed to a JSON1 function is built here and bound as a
//! statement parameter. Caller-supplied labels are always double-quoted, so
//! a `.` or `[` inside an id is a literal character, never path syntax. The
//! only label characters that cannot be quoted are `"` and control
//! characters, which [`validate_identifier`] rejects up front.

use sessiondb_core::{SessionDbError, SessionDbResult};

/// Reject identifiers that cannot be stored as a quoted JSON path label.
pub fn validate_identifier(kind: &str, value: &str) -> SessionDbResult<()> {
    if value.is_empty() {
        return Err(SessionDbError::Validation(format!("{kind} must not be empty")));
    }
    if value.contains('"') || value.chars().any(char::is_control) {
        return Err(SessionDbError::Validation(format!(
            "{kind} `{}` must not contain quotes or control characters",
            value.escape_debug()
        )));
    }
    Ok(())
}

/// Reject collection names that are not plain SQL identifiers.
///
/// Collection names are interpolated into DDL and table references, so they
/// get the stricter rule.
pub fn validate_collection(name: &str) -> SessionDbResult<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SessionDbError::Validation(format!(
            "collection `{name}` must be a plain identifier"
        )))
    }
}

pub const UPDATED_AT: &str = "$.updated_at";
pub const CREATED_AT: &str = "$.created_at";
pub const METADATA: &str = "$.metadata";
pub const AGENTS: &str = "$.agents";
pub const FEEDBACKS: &str = "$.feedbacks";
pub const FEEDBACKS_APPEND: &str = "$.feedbacks[#]";

pub fn metadata_key(key: &str) -> String {
    format!("$.metadata.\"{key}\"")
}

pub fn agent(agent_id: &str) -> String {
    format!("$.agents.\"{agent_id}\"")
}

pub fn agent_field(agent_id: &str, field: &str) -> String {
    format!("$.agents.\"{agent_id}\".{field}")
}

pub fn messages(agent_id: &str) -> String {
    agent_field(agent_id, "messages")
}

/// Path that appends to an agent's message array when used with `json_insert`.
pub fn messages_append(agent_id: &str) -> String {
    format!("{}[#]", messages(agent_id))
}

/// Path of the most recently appended message.
pub fn last_message(agent_id: &str) -> String {
    format!("{}[#-1]", messages(agent_id))
}

pub fn message_field(agent_id: &str, index: i64, field: &str) -> String {
    format!("{}[{index}].{field}", messages(agent_id))
}
