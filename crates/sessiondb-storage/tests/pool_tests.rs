// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection pool lifecycle tests, including the process-wide instance.

use std::sync::{Arc, Barrier};

use serial_test::serial;
use sessiondb_config::PoolConfig;
use sessiondb_core::SessionDbError;
use sessiondb_storage::ConnectionPool;

fn options() -> PoolConfig {
    PoolConfig {
        max_connections: 4,
        min_connections: 2,
        ..PoolConfig::default()
    }
}

#[test]
fn concurrent_first_initialize_builds_one_client() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("sqlite://{}", dir.path().join("race.db").display());
    let pool = ConnectionPool::new();
    let threads = 8;
    let barrier = Barrier::new(threads);

    let clients: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    pool.initialize(&uri, &options()).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &clients[0];
    assert!(clients.iter().all(|c| Arc::ptr_eq(c, first)));
    // Only the eagerly opened connections of a single client exist.
    let stats = pool.stats().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(Arc::strong_count(first), threads + 1);
}

#[test]
#[serial]
fn global_pool_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("sqlite://{}", dir.path().join("global.db").display());
    let pool = ConnectionPool::global();
    pool.close();

    assert!(matches!(
        pool.get_client().unwrap_err(),
        SessionDbError::NotInitialized
    ));
    let client = pool.initialize(&uri, &options()).unwrap();
    assert!(std::ptr::eq(pool, ConnectionPool::global()));
    assert!(Arc::ptr_eq(&client, &ConnectionPool::global().get_client().unwrap()));
    client.ping().unwrap();

    assert!(pool.close());
    assert!(!pool.close());
    assert!(pool.get_client().is_err());
}
