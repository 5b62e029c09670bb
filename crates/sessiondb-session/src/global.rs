// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide factory for frameworks that run one process per set of
//! concurrent requests.
//!
//! The global factory is bound to [`ConnectionPool::global`]. Closing it
//! also closes that pool.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use sessiondb_config::SessionDbConfig;
use sessiondb_core::{SessionDbError, SessionDbResult};
use sessiondb_storage::ConnectionPool;
use tracing::info;

use crate::factory::SessionManagerFactory;

static FACTORY: LazyLock<RwLock<Option<Arc<SessionManagerFactory>>>> =
    LazyLock::new(|| RwLock::new(None));

/// Build the global factory, or return the existing one.
pub fn initialize(config: &SessionDbConfig) -> SessionDbResult<Arc<SessionManagerFactory>> {
    if let Some(factory) = FACTORY.read().as_ref() {
        return Ok(Arc::clone(factory));
    }
    let mut slot = FACTORY.write();
    if let Some(factory) = slot.as_ref() {
        return Ok(Arc::clone(factory));
    }
    let factory = Arc::new(SessionManagerFactory::from_config(
        ConnectionPool::global(),
        config,
    )?);
    *slot = Some(Arc::clone(&factory));
    info!(collection = %factory.collection(), "global session manager factory initialized");
    Ok(factory)
}

/// The global factory. Fails with `NotInitialized` before [`initialize`].
pub fn get() -> SessionDbResult<Arc<SessionManagerFactory>> {
    FACTORY
        .read()
        .as_ref()
        .map(Arc::clone)
        .ok_or(SessionDbError::NotInitialized)
}

/// Drop the global factory and close the global pool. Idempotent.
///
/// Returns whether a factory was released.
pub fn close() -> bool {
    let released = FACTORY.write().take().is_some();
    if released {
        info!("global session manager factory closed");
    }
    ConnectionPool::global().close();
    released
}
