// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide sharing of one [`DocumentClient`].
//!
//! A [`ConnectionPool`] is an explicit handle: construct one at process start
//! and pass it down, or use [`ConnectionPool::global`] when a framework needs
//! a single instance reachable from anywhere. Either way the slot holding the
//! client is filled at most once per initialization, no matter how many
//! threads race to fill it.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use serde::Serialize;
use sessiondb_config::PoolConfig;
use sessiondb_core::{SessionDbError, SessionDbResult};
use tracing::{debug, info, warn};

use crate::client::DocumentClient;

static GLOBAL: LazyLock<ConnectionPool> = LazyLock::new(ConnectionPool::new);

/// Point-in-time pool statistics. Never probes the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub active: u32,
    pub available: u32,
    pub total: u32,
    pub server_version: String,
    pub options: PoolConfig,
}

/// Lazily initialized holder of the shared client.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    slot: RwLock<Option<Arc<DocumentClient>>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide pool.
    pub fn global() -> &'static ConnectionPool {
        &GLOBAL
    }

    /// Connect the shared client, or return it if already connected.
    ///
    /// The fast path only takes the read lock. On a miss the write lock is
    /// taken and the slot re-checked, so two threads racing here construct
    /// exactly one client; the client becomes visible to other threads only
    /// once fully built. A later call with different settings keeps the
    /// existing client and logs a warning.
    pub fn initialize(&self, uri: &str, options: &PoolConfig) -> SessionDbResult<Arc<DocumentClient>> {
        if let Some(client) = self.slot.read().as_ref() {
            warn_on_mismatch(client, uri, options);
            return Ok(Arc::clone(client));
        }

        let mut slot = self.slot.write();
        if let Some(client) = slot.as_ref() {
            warn_on_mismatch(client, uri, options);
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(DocumentClient::connect(uri, options)?);
        *slot = Some(Arc::clone(&client));
        info!(uri, max_connections = options.max_connections, "connection pool initialized");
        Ok(client)
    }

    /// The shared client. Fails with `NotInitialized` before [`initialize`](Self::initialize).
    pub fn get_client(&self) -> SessionDbResult<Arc<DocumentClient>> {
        self.slot
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(SessionDbError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn stats(&self) -> SessionDbResult<PoolStats> {
        let client = self.get_client()?;
        let counts = client.counts();
        Ok(PoolStats {
            active: counts.active,
            available: counts.available,
            total: counts.total,
            server_version: client.server_version().to_string(),
            options: client.options().clone(),
        })
    }

    /// Release the shared client. Calling this again is a no-op.
    ///
    /// Returns whether a client was released.
    pub fn close(&self) -> bool {
        let Some(client) = self.slot.write().take() else {
            debug!("connection pool already closed");
            return false;
        };
        client.close();
        info!(uri = %client.uri(), "connection pool closed");
        true
    }
}

fn warn_on_mismatch(client: &DocumentClient, uri: &str, options: &PoolConfig) {
    if client.uri() != uri || client.options() != options {
        warn!(
            existing_uri = %client.uri(),
            requested_uri = %uri,
            "connection pool already initialized; ignoring new settings"
        );
    }
}
