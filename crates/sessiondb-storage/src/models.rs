// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row projections returned by the reporting queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sessiondb_core::{Metadata, MetadataValue};

/// One session without its message history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub session_type: String,
    #[serde(with = "sessiondb_core::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "sessiondb_core::timestamp")]
    pub updated_at: DateTime<Utc>,
    pub metadata: Metadata,
    pub agents_count: u64,
    pub messages_count: u64,
    pub feedbacks_count: u64,
}

/// Metadata equality filter; every condition must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, MetadataValue)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `metadata.<key>` to equal `value`.
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.conditions.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(String, MetadataValue)] {
        &self.conditions
    }
}
