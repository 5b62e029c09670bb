// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the SessionDB persistence engine.

use thiserror::Error;

/// The primary error type returned by every SessionDB operation.
///
/// An absent session, agent or message is never an error: lookups return
/// `Ok(None)` and targeted writes return `Ok(false)` when nothing matched.
#[derive(Debug, Error)]
pub enum SessionDbError {
    /// Configuration errors (bad connection URI, invalid pool sizing).
    #[error("configuration error: {0}")]
    Config(String),

    /// The database client could not be constructed or opened.
    #[error("connection error: {source}")]
    Connection {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A statement failed while the client was in steady-state use.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The connection pool was used before `initialize` was called.
    #[error("connection pool not initialized -- call initialize() first")]
    NotInitialized,

    /// The client was used after it had been closed.
    #[error("database client is closed")]
    ClientClosed,

    /// No pooled connection became available in time.
    #[error("timed out after {duration:?} waiting for a pooled connection")]
    PoolTimeout { duration: std::time::Duration },

    /// Malformed input, rejected before any statement runs.
    #[error("validation error: {0}")]
    Validation(String),

    /// A session document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A hook rejected or failed an intercepted operation.
    #[error("hook error in {action}: {message}")]
    Hook { action: String, message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionDbError {
    /// Wrap a driver failure that happened during steady-state operation.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Wrap a failure to construct or open the client.
    pub fn connection(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Connection {
            source: source.into(),
        }
    }

    /// Build a hook error for the given action.
    pub fn hook(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            action: action.into(),
            message: message.into(),
        }
    }

    /// True for failures of the driver or the network path to the store.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Storage { .. } | Self::PoolTimeout { .. }
        )
    }
}

/// A convenience `Result` alias using [`SessionDbError`].
pub type SessionDbResult<T> = Result<T, SessionDbError>;
