// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for SessionDB integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - temp database, connection pool and manager factory
//! - [`RecordingNotifier`] - captures hook notifications, optionally failing
//! - [`fixtures`] - agent snapshots, metrics and unique session ids

pub mod fixtures;
pub mod harness;
pub mod notifier;

pub use fixtures::{metrics, session_id, snapshot};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use notifier::RecordingNotifier;
