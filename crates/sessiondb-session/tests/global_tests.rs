// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The process-wide factory shares the global connection pool.

use std::sync::Arc;

use serial_test::serial;
use sessiondb_config::SessionDbConfig;
use sessiondb_core::{NewMessage, Role, SessionDbError};
use sessiondb_session::global;
use sessiondb_storage::ConnectionPool;

fn config(dir: &tempfile::TempDir) -> SessionDbConfig {
    let mut config = SessionDbConfig::default();
    config.storage.connection_uri = format!("sqlite://{}", dir.path().join("global.db").display());
    config
}

#[test]
#[serial]
fn global_factory_lifecycle() {
    global::close();
    assert!(matches!(global::get().unwrap_err(), SessionDbError::NotInitialized));

    let dir = tempfile::tempdir().unwrap();
    let factory = global::initialize(&config(&dir)).unwrap();
    let again = global::initialize(&SessionDbConfig::default()).unwrap();
    assert!(Arc::ptr_eq(&factory, &again));
    assert!(Arc::ptr_eq(&factory, &global::get().unwrap()));
    assert!(Arc::ptr_eq(
        factory.client(),
        &ConnectionPool::global().get_client().unwrap()
    ));

    let manager = factory.create_session_manager("s1", None).unwrap();
    manager
        .append_message("a", &NewMessage::text(Role::User, "hello"))
        .unwrap();
    manager.close();
    assert!(!factory.client().is_closed());

    assert!(global::close());
    assert!(!global::close());
    assert!(factory.client().is_closed());
    assert!(global::get().is_err());
    assert!(!ConnectionPool::global().is_initialized());
}

#[test]
#[serial]
fn reinitialize_after_close_reopens_the_store() {
    global::close();
    let dir = tempfile::tempdir().unwrap();
    let factory = global::initialize(&config(&dir)).unwrap();
    factory
        .create_session_manager("persisted", None)
        .unwrap()
        .append_message("a", &NewMessage::text(Role::User, "kept"))
        .unwrap();
    global::close();

    let factory = global::initialize(&config(&dir)).unwrap();
    let manager = factory.create_session_manager("persisted", None).unwrap();
    let restored = manager.restore_agent("a").unwrap().unwrap();
    assert_eq!(restored.messages[0].content[0].as_text(), Some("kept"));
    global::close();
}
