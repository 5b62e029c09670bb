// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only reporting over stored sessions.
//!
//! This crate never writes. It backs search and inspection tools with
//! paginated session summaries, a merged per-session timeline, and
//! discovery of the metadata fields in use.

pub mod fields;
pub mod service;
pub mod timeline;

pub use fields::{FieldInfo, FieldType};
pub use service::{Page, ReportService, SessionDetail};
pub use timeline::{TimelineEntry, merge_timeline};
