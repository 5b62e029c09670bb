// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the SessionDB persistence engine.
//!
//! This crate provides the error taxonomy and the session document model
//! shared by the storage, session and reporting crates.

pub mod error;
pub mod metadata;
pub mod snapshot;
pub mod timestamp;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{SessionDbError, SessionDbResult};
pub use metadata::{Metadata, MetadataValue};
pub use snapshot::{AgentSnapshot, MetricsSummary, RestoredAgent};
pub use types::{
    AgentData, ContentBlock, EventLoopMetrics, Feedback, Message, MessagePatch, NewMessage,
    Rating, Role, Session, SessionAgent, DEFAULT_SESSION_TYPE,
};
