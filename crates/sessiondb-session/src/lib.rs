// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation session management for SessionDB.
//!
//! A [`SessionManager`] binds one `session_id` to a
//! [`SessionRepository`](sessiondb_storage::SessionRepository) and layers the
//! agent-facing operations on top of it: message append, agent sync with
//! metrics capture, conversation restore, and metadata/feedback access routed
//! through optional [`Hooks`]. Managers are cheap to create from a
//! [`SessionManagerFactory`] bound to a shared connection pool.

pub mod factory;
pub mod global;
pub mod hooks;
pub mod manager;

pub use factory::SessionManagerFactory;
pub use hooks::{
    AuditHook, ChannelNotifier, FeedbackCall, FeedbackOutcome, HookAction, Hooks, Invocation,
    MetadataCall, MetadataOutcome, Notification, NotificationHook, Notifier, SessionHook,
};
pub use manager::{SessionManager, SyncOutcome};
