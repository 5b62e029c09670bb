// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for SessionDB.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level SessionDB configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionDbConfig {
    /// Document store connection settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Read-only reporting settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Document store connection configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Connection URI: `sqlite://<path>`, `sqlite::memory:`, or a bare file path.
    #[serde(default = "default_connection_uri")]
    pub connection_uri: String,

    /// Name of the table holding session documents.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Connection pool sizing, handed to the client verbatim.
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_uri: default_connection_uri(),
            collection: default_collection(),
            pool: PoolConfig::default(),
        }
    }
}

fn default_connection_uri() -> String {
    "sqlite://sessiondb.db".to_string()
}

fn default_collection() -> String {
    "sessions".to_string()
}

/// Connection pool options.
///
/// The engine does not interpret these beyond passing them to the client
/// and reporting them in pool statistics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Upper bound on simultaneously checked-out connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections opened eagerly and never reaped.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Idle connections above the minimum are dropped after this many seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How long to wait for a free connection before failing.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// SQLite busy handler timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Retry a write once when the store reports a transient lock.
    #[serde(default = "default_true")]
    pub retry_writes: bool,

    /// Retry a read once when the store reports a transient lock.
    #[serde(default = "default_true")]
    pub retry_reads: bool,
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            idle_timeout_secs: default_idle_timeout_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
            retry_writes: true,
            retry_reads: true,
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Reporting configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Page size used when the caller does not ask for one.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Requested page sizes are clamped to this value.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// A string field with at most this many distinct values is reported as an enum.
    #[serde(default = "default_enum_value_cap")]
    pub enum_value_cap: u32,

    /// Metadata keys that get an expression index and show up in field discovery.
    #[serde(default)]
    pub indexed_fields: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            enum_value_cap: default_enum_value_cap(),
            indexed_fields: Vec::new(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

fn default_enum_value_cap() -> u32 {
    25
}
