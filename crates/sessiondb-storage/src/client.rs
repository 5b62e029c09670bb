// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pooled SQLite document client.
//!
//! Connections come from an `r2d2` pool over `r2d2_sqlite`. Every connection
//! is put in WAL mode with the configured busy timeout before first use.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode};
use sessiondb_config::PoolConfig;
use sessiondb_core::{SessionDbError, SessionDbResult};
use tracing::{debug, info, warn};

use crate::migrations;

/// Whether an operation reads or writes, for the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Memory,
}

impl Target {
    /// Parse a connection URI.
    ///
    /// Accepts `sqlite://<path>`, `sqlite::memory:`, `:memory:` and bare
    /// filesystem paths.
    pub fn parse(uri: &str) -> SessionDbResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(SessionDbError::Config(
                "connection URI must not be empty".into(),
            ));
        }
        if uri == "sqlite::memory:" || uri == ":memory:" || uri == "sqlite://:memory:" {
            return Ok(Self::Memory);
        }
        if let Some(path) = uri.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(SessionDbError::Config(format!(
                    "connection URI `{uri}` has no database path"
                )));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(SessionDbError::Config(format!(
                "unsupported connection scheme `{scheme}` (expected sqlite://)"
            )));
        }
        Ok(Self::File(PathBuf::from(uri)))
    }
}

/// Point-in-time connection counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionCounts {
    pub active: u32,
    pub available: u32,
    pub total: u32,
}

/// Sends connection errors raised inside the pool to the log.
#[derive(Debug)]
struct LogPoolErrors;

impl r2d2::HandleError<rusqlite::Error> for LogPoolErrors {
    fn handle_error(&self, error: rusqlite::Error) {
        warn!(error = %error, "pooled connection failed");
    }
}

/// A pooled SQLite client shared by every repository in the process.
pub struct DocumentClient {
    uri: String,
    target: Target,
    options: PoolConfig,
    server_version: String,
    pool: RwLock<Option<Pool<SqliteConnectionManager>>>,
    checked_out: AtomicU32,
    /// `(collection, sorted indexed fields)` already set up through this client.
    prepared: Mutex<HashSet<(String, Vec<String>)>>,
}

impl std::fmt::Debug for DocumentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClient")
            .field("uri", &self.uri)
            .field("server_version", &self.server_version)
            .field("counts", &self.counts())
            .finish()
    }
}

impl DocumentClient {
    /// Run migrations, then build the pool and wait for `min_connections`.
    ///
    /// Any failure here is fatal and surfaces as [`SessionDbError::Connection`].
    /// In-memory databases are private to one connection, so they are always
    /// served by exactly one that is never recycled.
    pub fn connect(uri: &str, options: &PoolConfig) -> SessionDbResult<Self> {
        let target = Target::parse(uri)?;

        if let Target::File(path) = &target
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(SessionDbError::connection)?;
        }

        let (pool, server_version) = match &target {
            // Migrating outside the pool leaves it holding exactly `min_idle`.
            Target::File(path) => {
                let mut conn = Connection::open(path).map_err(SessionDbError::connection)?;
                init_connection(&conn, options.busy_timeout())
                    .map_err(SessionDbError::connection)?;
                let version = migrate(&mut conn)?;
                drop(conn);
                let pool = build_pool(&target, options).map_err(SessionDbError::connection)?;
                (pool, version)
            }
            Target::Memory => {
                let pool = build_pool(&target, options).map_err(SessionDbError::connection)?;
                let version = {
                    let mut conn = pool.get().map_err(SessionDbError::connection)?;
                    migrate(&mut *conn)?
                };
                (pool, version)
            }
        };

        info!(
            uri,
            server_version = %server_version,
            connections = pool.state().connections,
            max_connections = pool.max_size(),
            "document client connected"
        );

        Ok(Self {
            uri: uri.to_string(),
            target,
            options: options.clone(),
            server_version,
            pool: RwLock::new(Some(pool)),
            checked_out: AtomicU32::new(0),
            prepared: Mutex::new(HashSet::new()),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn options(&self) -> &PoolConfig {
        &self.options
    }

    /// The SQLite library version reported when the client opened.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn is_closed(&self) -> bool {
        self.pool.read().is_none()
    }

    /// Connection counts without touching the database. All zero once closed.
    ///
    /// `total` includes connections the pool is still opening in the background.
    pub fn counts(&self) -> ConnectionCounts {
        match self.pool.read().as_ref() {
            Some(pool) => {
                let state = pool.state();
                ConnectionCounts {
                    active: self.checked_out.load(Ordering::Acquire),
                    available: state.idle_connections,
                    total: state.connections,
                }
            }
            None => ConnectionCounts {
                active: 0,
                available: 0,
                total: 0,
            },
        }
    }

    /// Run `f` on a pooled connection.
    ///
    /// When the retry policy for `access` is enabled, a single retry is made
    /// if the first attempt failed with `SQLITE_BUSY` or `SQLITE_LOCKED`.
    pub fn with_connection<T, F>(&self, access: Access, mut f: F) -> SessionDbResult<T>
    where
        F: FnMut(&mut Connection) -> SessionDbResult<T>,
    {
        let pool = self
            .pool
            .read()
            .clone()
            .ok_or(SessionDbError::ClientClosed)?;
        let mut conn = pool.get().map_err(|e| {
            debug!(error = %e, "connection checkout failed");
            SessionDbError::PoolTimeout {
                duration: self.options.acquire_timeout(),
            }
        })?;
        self.checked_out.fetch_add(1, Ordering::AcqRel);
        let result = match f(&mut *conn) {
            Err(err) if self.retries(access) && is_contention(&err) => {
                debug!(?access, error = %err, "retrying after lock contention");
                f(&mut *conn)
            }
            result => result,
        };
        drop(conn);
        self.checked_out.fetch_sub(1, Ordering::AcqRel);
        result
    }

    /// Health check: `SELECT 1` on a pooled connection.
    pub fn ping(&self) -> SessionDbResult<()> {
        self.with_connection(Access::Read, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(SessionDbError::storage)?;
            Ok(())
        })
    }

    /// Drop the pool and refuse new work.
    ///
    /// Connections still checked out close when their caller finishes.
    /// Returns `false` if the client was already closed.
    pub fn close(&self) -> bool {
        let Some(pool) = self.pool.write().take() else {
            return false;
        };
        if let Target::File(_) = self.target
            && let Some(conn) = pool.try_get()
            && let Err(e) = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        {
            warn!(uri = %self.uri, error = %e, "WAL checkpoint on close failed");
        }
        drop(pool);
        info!(uri = %self.uri, "document client closed");
        true
    }

    /// Whether a collection's table and the indexes for `fields` were already
    /// created through this client.
    pub(crate) fn is_prepared(&self, collection: &str, fields: &[String]) -> bool {
        self.prepared.lock().contains(&prepared_key(collection, fields))
    }

    pub(crate) fn mark_prepared(&self, collection: &str, fields: &[String]) {
        self.prepared.lock().insert(prepared_key(collection, fields));
    }

    fn retries(&self, access: Access) -> bool {
        match access {
            Access::Read => self.options.retry_reads,
            Access::Write => self.options.retry_writes,
        }
    }
}

fn prepared_key(collection: &str, fields: &[String]) -> (String, Vec<String>) {
    let mut fields = fields.to_vec();
    fields.sort();
    fields.dedup();
    (collection.to_string(), fields)
}

fn init_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")
}

/// Apply pending migrations and report the SQLite library version.
fn migrate(conn: &mut Connection) -> SessionDbResult<String> {
    migrations::run_migrations(conn)?;
    conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .map_err(SessionDbError::connection)
}

fn build_pool(
    target: &Target,
    options: &PoolConfig,
) -> Result<Pool<SqliteConnectionManager>, r2d2::Error> {
    let busy_timeout = options.busy_timeout();
    let manager = match target {
        Target::File(path) => SqliteConnectionManager::file(path),
        Target::Memory => SqliteConnectionManager::memory(),
    }
    .with_init(move |conn: &mut Connection| init_connection(conn, busy_timeout));

    let (max_size, min_idle, idle_timeout) = match target {
        Target::Memory => (1, 1, None),
        Target::File(_) => {
            let max = options.max_connections.max(1);
            let idle = options.idle_timeout();
            (
                max,
                options.min_connections.clamp(1, max),
                (!idle.is_zero()).then_some(idle),
            )
        }
    };

    Pool::builder()
        .max_size(max_size)
        .min_idle(Some(min_idle))
        .idle_timeout(idle_timeout)
        .max_lifetime(None)
        .test_on_check_out(false)
        .connection_timeout(options.acquire_timeout().max(Duration::from_millis(1)))
        .error_handler(Box::new(LogPoolErrors))
        .build(manager)
}

fn is_contention(err: &SessionDbError) -> bool {
    let SessionDbError::Storage { source } = err else {
        return false;
    };
    matches!(
        source.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
