// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reporting service.

use serde::Serialize;
use sessiondb_config::ReportConfig;
use sessiondb_core::{Session, SessionDbResult};
use sessiondb_storage::{MetadataFilter, SessionRepository, SessionSummary};
use tracing::debug;

use crate::fields::{self, FieldInfo};
use crate::timeline::{TimelineEntry, merge_timeline};

/// Number of most recently updated sessions sampled by field discovery.
const FIELD_SAMPLE_LIMIT: u64 = 500;

/// One page of results. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub pages: u64,
}

/// A full session with its merged timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub timeline: Vec<TimelineEntry>,
}

/// Read-only queries for search and inspection tools.
#[derive(Debug)]
pub struct ReportService {
    repository: SessionRepository,
    config: ReportConfig,
}

impl ReportService {
    pub fn new(repository: SessionRepository, config: ReportConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    /// Sessions ordered by most recent update.
    ///
    /// `page_size` defaults to the configured page size and is clamped to
    /// `max_page_size`; page 0 is treated as page 1.
    pub fn list_sessions(
        &self,
        page: u32,
        page_size: Option<u32>,
        filter: &MetadataFilter,
    ) -> SessionDbResult<Page<SessionSummary>> {
        let page = page.max(1);
        let page_size = page_size
            .unwrap_or(self.config.page_size)
            .clamp(1, self.config.max_page_size.max(1));
        let total = self.repository.count_sessions(filter)?;
        let offset = u64::from(page - 1) * u64::from(page_size);
        let items = if offset < total {
            self.repository
                .list_session_summaries(offset, u64::from(page_size), filter)?
        } else {
            Vec::new()
        };
        debug!(page, page_size, total, returned = items.len(), "listed sessions");
        Ok(Page {
            items,
            page,
            page_size,
            total,
            pages: total.div_ceil(u64::from(page_size)),
        })
    }

    pub fn session_detail(&self, session_id: &str) -> SessionDbResult<Option<SessionDetail>> {
        Ok(self
            .repository
            .read_session(session_id)?
            .map(|session| SessionDetail {
                timeline: merge_timeline(&session),
                session,
            }))
    }

    /// Metadata fields seen in recent sessions plus every indexed field,
    /// sorted by name.
    pub fn discover_fields(&self) -> SessionDbResult<Vec<FieldInfo>> {
        let mut names = self.repository.metadata_keys(FIELD_SAMPLE_LIMIT)?;
        for indexed in &self.config.indexed_fields {
            if !names.contains(indexed) {
                names.push(indexed.clone());
            }
        }
        names.sort();

        let enum_cap = self.config.enum_value_cap as usize;
        names
            .into_iter()
            .map(|name| {
                let samples = self
                    .repository
                    .metadata_field_values(&name, FIELD_SAMPLE_LIMIT)?;
                let (field_type, values) = fields::infer(&samples, enum_cap);
                Ok(FieldInfo {
                    indexed: self.config.indexed_fields.contains(&name),
                    name,
                    field_type,
                    values,
                })
            })
            .collect()
    }
}
