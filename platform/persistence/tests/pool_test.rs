//! Pool lifecycle and contention behavior over a real SQLite file.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use persistence::{ConnectionPool, DbConfig, Params};

use common::pool_with_schema;

#[test]
fn acquire_blocks_until_timeout_when_exhausted() {
    let (pool, _dir) = pool_with_schema(1, "");

    let held = pool.acquire().expect("first acquire");

    let contender = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let started = Instant::now();
            let result = pool.acquire();
            (result.is_err(), started.elapsed())
        })
    };

    let (timed_out, elapsed) = contender.join().expect("contender thread");
    assert!(timed_out, "second acquire should time out");
    assert!(
        elapsed >= Duration::from_millis(900),
        "waited only {elapsed:?}"
    );
    assert!(elapsed < Duration::from_secs(3), "waited {elapsed:?}");

    drop(held);
    let again = pool.acquire().expect("acquire after release");
    drop(again);
}

#[test]
fn released_connections_return_to_the_idle_queue() {
    let (pool, _dir) = pool_with_schema(2, "");
    assert_eq!(pool.idle_connections(), 2);

    for _ in 0..10 {
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.idle_connections(), 0);
        drop(a);
        drop(b);
    }
    assert_eq!(pool.idle_connections(), 2);
}

#[test]
fn connection_returns_even_when_work_panics() {
    let (pool, _dir) = pool_with_schema(1, "");

    let result = catch_unwind(AssertUnwindSafe(|| {
        let guard = pool.acquire().unwrap();
        guard.with(|_conn| panic!("work exploded"));
    }));
    assert!(result.is_err());

    // The guard was dropped during unwinding, so the connection is back.
    assert_eq!(pool.idle_connections(), 1);
    let guard = pool.acquire().expect("pool usable after panic");
    guard.with(|conn| {
        conn.query("SELECT 1 AS one", &Params::new()).unwrap();
    });
}

#[test]
fn waiter_acquires_as_soon_as_a_connection_frees() {
    let (pool, _dir) = pool_with_schema(1, "");
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let started = Instant::now();
            let result = pool.acquire();
            (result.is_ok(), started.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(200));
    drop(held);

    let (acquired, elapsed) = waiter.join().unwrap();
    assert!(acquired, "waiter should get the freed connection");
    assert!(elapsed < Duration::from_secs(1), "waited {elapsed:?}");
}

#[test]
fn shutdown_rejects_new_acquisitions_and_wakes_waiters() {
    let (pool, _dir) = pool_with_schema(1, "");
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let started = Instant::now();
            let result = pool.acquire();
            (result.is_err(), started.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(100));
    pool.shutdown();

    let (rejected, elapsed) = waiter.join().unwrap();
    assert!(rejected, "waiter must observe shutdown");
    assert!(
        elapsed < Duration::from_millis(900),
        "shutdown should wake waiters before the timeout; waited {elapsed:?}"
    );

    assert!(pool.acquire().is_err());
    drop(held);
}

#[test]
fn acquire_before_initialize_fails() {
    let pool = Arc::new(ConnectionPool::new());
    assert!(pool.acquire().is_err());
}

#[test]
fn initialize_twice_is_a_warning_not_an_error() {
    let (pool, dir) = pool_with_schema(1, "");
    let config = DbConfig::sqlite(dir.path().join("test.db").to_string_lossy().to_string());
    assert!(pool.initialize(&config).is_ok());
    assert_eq!(pool.tracked_connections(), 1);
}

#[test]
fn concurrent_writers_share_the_pool_without_losing_rows() {
    let (pool, _dir) = pool_with_schema(
        3,
        "CREATE TABLE entries (id TEXT PRIMARY KEY, worker INTEGER NOT NULL)",
    );

    let mut handles = Vec::new();
    for worker in 0..3i64 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for i in 0..20 {
                let guard = pool.acquire().expect("acquire");
                guard.with(|conn| {
                    let mut params = Params::new();
                    params.insert("id".into(), format!("w{worker}-{i}").into());
                    params.insert("worker".into(), worker.into());
                    conn.execute(
                        "INSERT INTO entries (id, worker) VALUES (:id, :worker)",
                        &params,
                    )
                    .expect("insert");
                });
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let guard = pool.acquire().unwrap();
    let rows = guard.with(|conn| {
        conn.query("SELECT COUNT(*) AS n FROM entries", &Params::new())
            .unwrap()
    });
    assert_eq!(rows[0]["n"].as_i64(), Some(60));
    assert_eq!(pool.idle_connections(), 2);
}
