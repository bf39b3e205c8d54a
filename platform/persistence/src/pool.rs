//! Bounded connection pool with blocking, timeout-aware acquisition.
//!
//! The pool exclusively owns every connection it creates. Callers receive a
//! [`PooledConnection`] guard; dropping the guard returns the handle to the
//! idle queue (or closes it during shutdown), so a connection finds its way
//! back on every exit path, including unwinding.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use platform_contracts::{ServiceError, ServiceResult};

use crate::connection::DbConnection;
use crate::sqlite::SqliteConnection;

/// Supported database engines. Only SQLite is constructible today; the other
/// variants keep the configuration surface stable for hosts that wire in a
/// server engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Sqlite,
    Postgres,
    Mysql,
}

/// Pool configuration, injected by the hosting application at startup.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub engine: EngineKind,
    pub database: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_connections: usize,
    pub connection_timeout: Duration,
}

impl DbConfig {
    /// SQLite configuration with conservative defaults.
    pub fn sqlite(database: impl Into<String>) -> Self {
        Self {
            engine: EngineKind::Sqlite,
            database: database.into(),
            host: None,
            port: None,
            username: None,
            password: None,
            max_connections: 4,
            connection_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolPhase {
    Uninitialized,
    Ready,
    ShuttingDown,
    Drained,
}

type SharedConnection = Arc<Mutex<Box<dyn DbConnection>>>;

struct PoolState {
    phase: PoolPhase,
    idle: VecDeque<SharedConnection>,
    tracked: Vec<SharedConnection>,
    timeout: Duration,
}

/// Process-wide bounded pool of database connections.
///
/// Constructed once in the composition root and shared by `Arc`; all state
/// transitions happen under a single mutex paired with a condition variable.
pub struct ConnectionPool {
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState {
                phase: PoolPhase::Uninitialized,
                idle: VecDeque::new(),
                tracked: Vec::new(),
                timeout: Duration::from_secs(5),
            }),
            available: Condvar::new(),
        }
    }

    /// Create and open the configured number of connections.
    ///
    /// A partially filled pool proceeds with whatever opened; zero usable
    /// connections is a *DatabaseError*. Valid only before the pool is ready.
    pub fn initialize(&self, config: &DbConfig) -> ServiceResult<()> {
        let mut state = relock(&self.state);
        match state.phase {
            PoolPhase::Ready => {
                tracing::warn!("pool already initialized; skipping re-initialization");
                return Ok(());
            }
            PoolPhase::ShuttingDown | PoolPhase::Drained => {
                return Err(ServiceError::server(
                    "cannot initialize a pool that is shutting down",
                ));
            }
            PoolPhase::Uninitialized => {}
        }

        state.timeout = config.connection_timeout;
        for i in 0..config.max_connections {
            let mut conn = match create_connection(config) {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(index = i, error = %e, "failed to create connection");
                    continue;
                }
            };
            match conn.open() {
                Ok(()) => {
                    let shared: SharedConnection = Arc::new(Mutex::new(conn));
                    state.idle.push_back(shared.clone());
                    state.tracked.push(shared);
                }
                Err(e) => {
                    tracing::error!(index = i, error = %e, "failed to open connection");
                }
            }
        }

        if state.idle.is_empty() {
            return Err(ServiceError::database(
                "failed to open any database connections",
            ));
        }
        if state.idle.len() < config.max_connections {
            tracing::warn!(
                opened = state.idle.len(),
                requested = config.max_connections,
                "pool initialized below requested size"
            );
        } else {
            tracing::info!(connections = state.idle.len(), "connection pool ready");
        }
        state.phase = PoolPhase::Ready;
        Ok(())
    }

    /// Borrow a connection, waiting up to the configured timeout when all
    /// connections are checked out.
    pub fn acquire(&self) -> ServiceResult<PooledConnection<'_>> {
        let mut state = relock(&self.state);
        match state.phase {
            PoolPhase::Uninitialized => {
                return Err(ServiceError::server("connection pool is not initialized"));
            }
            PoolPhase::ShuttingDown | PoolPhase::Drained => {
                return Err(ServiceError::database("connection pool is shutting down"));
            }
            PoolPhase::Ready => {}
        }

        if let Some(conn) = state.idle.pop_front() {
            return Ok(PooledConnection { conn, pool: self });
        }

        tracing::debug!("no idle connections; waiting");
        let timeout = state.timeout;
        let (mut state, wait) = self
            .available
            .wait_timeout_while(state, timeout, |s| {
                s.idle.is_empty() && s.phase == PoolPhase::Ready
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.phase != PoolPhase::Ready {
            return Err(ServiceError::database("connection pool is shutting down"));
        }
        match state.idle.pop_front() {
            Some(conn) => Ok(PooledConnection { conn, pool: self }),
            None => {
                debug_assert!(wait.timed_out());
                tracing::error!(?timeout, "timed out acquiring a database connection");
                Err(ServiceError::database(
                    "timed out waiting for a database connection",
                ))
            }
        }
    }

    /// Return a connection to the idle queue; during shutdown it is closed
    /// instead. Invoked by the guard on drop.
    fn release(&self, conn: SharedConnection) {
        let requeue = {
            let state = relock(&self.state);
            state.phase == PoolPhase::Ready
        };

        if requeue {
            // Reset outside the pool lock so a slow rollback cannot stall
            // other acquire/release traffic.
            relock(&conn).reset();
            let mut state = relock(&self.state);
            if state.phase == PoolPhase::Ready {
                state.idle.push_back(conn);
                drop(state);
                self.available.notify_one();
                return;
            }
        }
        relock(&conn).close();
    }

    /// Reject new acquisitions, wake every waiter, and close all tracked
    /// connections — including those currently checked out, whose holders
    /// will observe errors on subsequent operations.
    pub fn shutdown(&self) {
        let connections = {
            let mut state = relock(&self.state);
            if state.phase == PoolPhase::Drained {
                return;
            }
            state.phase = PoolPhase::ShuttingDown;
            state.idle.clear();
            std::mem::take(&mut state.tracked)
        };
        self.available.notify_all();

        tracing::info!(connections = connections.len(), "shutting down pool");
        for conn in &connections {
            relock(conn).close();
        }

        let mut state = relock(&self.state);
        state.phase = PoolPhase::Drained;
        tracing::info!("connection pool drained");
    }

    /// Number of idle connections; diagnostic only.
    pub fn idle_connections(&self) -> usize {
        relock(&self.state).idle.len()
    }

    /// Number of connections the pool tracks, checked out or idle.
    pub fn tracked_connections(&self) -> usize {
        relock(&self.state).tracked.len()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped borrow of a pooled connection; releases itself on drop, so the
/// connection returns to the pool on every exit path.
pub struct PooledConnection<'pool> {
    conn: SharedConnection,
    pool: &'pool ConnectionPool,
}

impl PooledConnection<'_> {
    /// Run `f` with exclusive access to the underlying connection.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn DbConnection) -> R) -> R {
        let mut guard = relock(&self.conn);
        f(guard.as_mut())
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool.release(Arc::clone(&self.conn));
    }
}

fn create_connection(config: &DbConfig) -> ServiceResult<Box<dyn DbConnection>> {
    match config.engine {
        EngineKind::Sqlite => Ok(Box::new(SqliteConnection::new(config.database.clone()))),
        EngineKind::Postgres | EngineKind::Mysql => Err(ServiceError::invalid_input(format!(
            "unsupported database engine: {:?}",
            config.engine
        ))),
    }
}

/// Lock that survives poisoning: a panic inside a subscriber or work callback
/// must not wedge the pool, so the inner state is recovered as-is.
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
