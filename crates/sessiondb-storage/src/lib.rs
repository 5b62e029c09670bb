// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite document store for SessionDB.
//!
//! Each session is one JSON document in a collection table. Writes are
//! single statements built from the JSON1 functions, so every update is
//! atomic at the document level and touches only the fields it names. A
//! bounded pool of WAL-mode connections is shared through
//! [`ConnectionPool`], and [`SessionRepository`] is the typed API over it.

pub mod client;
pub mod migrations;
pub mod models;
pub mod paths;
pub mod pool;
pub mod queries;
pub mod repository;

pub use client::{Access, DocumentClient, Target};
pub use models::{MetadataFilter, SessionSummary};
pub use pool::{ConnectionPool, PoolStats};
pub use repository::SessionRepository;
