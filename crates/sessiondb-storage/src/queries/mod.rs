// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed statements over one session collection.
//!
//! Each function takes a borrowed connection and the (already validated)
//! collection name, and issues either a single statement or a single
//! IMMEDIATE transaction. Nothing here validates caller identifiers; that is
//! the repository's job.

pub mod agents;
pub mod feedback;
pub mod messages;
pub mod metadata;
pub mod reporting;
pub mod sessions;

use sessiondb_core::timestamp;

/// The collection name as a quoted SQL identifier.
pub(crate) fn table(collection: &str) -> String {
    format!("\"{collection}\"")
}

/// The current time in stored form.
pub(crate) fn now_string() -> String {
    timestamp::format(&timestamp::now())
}
