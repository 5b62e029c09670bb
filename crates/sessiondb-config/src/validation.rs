// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as supported URI schemes, pool bounds and identifier shapes.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::SessionDbConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SessionDbConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let uri = config.storage.connection_uri.trim();
    if uri.is_empty() {
        fail("storage.connection_uri must not be empty".to_string());
    } else if uri.contains("://") && !uri.starts_with("sqlite://") {
        fail(format!(
            "storage.connection_uri `{uri}` uses an unsupported scheme (expected sqlite://)"
        ));
    }

    let collection = &config.storage.collection;
    if !is_identifier(collection) {
        fail(format!(
            "storage.collection `{collection}` must start with a letter or underscore and contain only letters, digits and underscores"
        ));
    }

    let pool = &config.storage.pool;
    if pool.max_connections < 1 {
        fail("storage.pool.max_connections must be at least 1".to_string());
    }
    if pool.min_connections > pool.max_connections {
        fail(format!(
            "storage.pool.min_connections ({}) must not exceed max_connections ({})",
            pool.min_connections, pool.max_connections
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "logging.level `{}` must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    let report = &config.report;
    if report.page_size < 1 {
        fail("report.page_size must be at least 1".to_string());
    }
    if report.page_size > report.max_page_size {
        fail(format!(
            "report.page_size ({}) must not exceed max_page_size ({})",
            report.page_size, report.max_page_size
        ));
    }
    if report.enum_value_cap < 1 {
        fail("report.enum_value_cap must be at least 1".to_string());
    }

    let mut seen = HashSet::new();
    for (i, field) in report.indexed_fields.iter().enumerate() {
        if field.trim().is_empty() {
            fail(format!("report.indexed_fields[{i}] must not be empty"));
        } else if field.contains('"') || field.chars().any(char::is_control) {
            fail(format!(
                "report.indexed_fields[{i}] `{field}` must not contain quotes or control characters"
            ));
        }
        if !seen.insert(field) {
            fail(format!("duplicate indexed field `{field}` in report.indexed_fields"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
