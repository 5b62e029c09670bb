// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration testing.
//!
//! `TestHarness` assembles a file-backed database in a temp directory, a
//! dedicated connection pool and a manager factory bound to it. Each harness
//! has its own pool, so tests do not share state through the global one.

use sessiondb_config::{PoolConfig, ReportConfig, SessionDbConfig, StorageConfig};
use sessiondb_core::{SessionDbError, SessionDbResult};
use sessiondb_session::{Hooks, SessionManager, SessionManagerFactory};
use sessiondb_storage::{ConnectionPool, SessionRepository};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    collection: String,
    max_connections: u32,
    indexed_fields: Vec<String>,
    hooks: Hooks,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            collection: "sessions".to_string(),
            max_connections: 8,
            indexed_fields: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Metadata keys that get an expression index and appear in field discovery.
    pub fn with_indexed_fields(mut self, fields: &[&str]) -> Self {
        self.indexed_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Hooks installed on every manager the harness creates by default.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build the harness: temp database, pool and factory.
    pub fn build(self) -> SessionDbResult<TestHarness> {
        let temp_dir = tempfile::TempDir::new().map_err(SessionDbError::connection)?;
        let db_path = temp_dir.path().join("sessions.db");

        let config = SessionDbConfig {
            storage: StorageConfig {
                connection_uri: format!("sqlite://{}", db_path.display()),
                collection: self.collection,
                pool: PoolConfig {
                    max_connections: self.max_connections,
                    min_connections: 1,
                    ..PoolConfig::default()
                },
            },
            report: ReportConfig {
                indexed_fields: self.indexed_fields,
                ..ReportConfig::default()
            },
            ..SessionDbConfig::default()
        };

        let pool = ConnectionPool::new();
        let factory =
            SessionManagerFactory::from_config(&pool, &config)?.with_default_hooks(self.hooks);
        tracing::debug!(uri = %config.storage.connection_uri, "test harness ready");

        Ok(TestHarness {
            pool,
            factory,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over a temp database.
pub struct TestHarness {
    /// Pool owning the shared client.
    pub pool: ConnectionPool,
    /// Factory bound to the pool's client.
    pub factory: SessionManagerFactory,
    /// Configuration the harness was built from.
    pub config: SessionDbConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub fn new() -> SessionDbResult<Self> {
        Self::builder().build()
    }

    /// Open (or join) `session_id` with the harness's default hooks.
    pub fn manager(&self, session_id: &str) -> SessionDbResult<SessionManager> {
        self.factory.create_session_manager(session_id, None)
    }

    pub fn manager_with_hooks(&self, session_id: &str, hooks: Hooks) -> SessionDbResult<SessionManager> {
        self.factory.create_session_manager(session_id, Some(hooks))
    }

    /// A repository borrowing the harness's client.
    pub fn repository(&self) -> SessionDbResult<SessionRepository> {
        self.factory.repository()
    }
}
