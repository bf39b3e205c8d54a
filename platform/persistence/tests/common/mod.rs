use std::sync::Arc;
use std::time::Duration;

use persistence::{ConnectionPool, DbConfig, Params};
use tempfile::TempDir;

/// Open a pool over a fresh temp-file database and run the given DDL.
pub fn pool_with_schema(max_connections: usize, schema: &str) -> (Arc<ConnectionPool>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("test.db");
    let config = DbConfig::sqlite(path.to_string_lossy().to_string())
        .with_max_connections(max_connections)
        .with_connection_timeout(Duration::from_secs(1));

    let pool = Arc::new(ConnectionPool::new());
    pool.initialize(&config).expect("pool init");

    if !schema.is_empty() {
        let guard = pool.acquire().expect("schema connection");
        guard.with(|conn| {
            for statement in schema.split(';').filter(|s| !s.trim().is_empty()) {
                conn.execute(statement, &Params::new()).expect("schema DDL");
            }
        });
    }
    (pool, dir)
}
