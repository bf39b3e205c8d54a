//! # Persistence
//!
//! The data-access tier: a [`DbConnection`] abstraction with a SQLite adapter,
//! a bounded [`ConnectionPool`] with blocking timed acquisition, and the
//! generic [`Repository`] that maps typed business records onto relational
//! rows.
//!
//! Services never talk to the engine directly. Read paths go through a
//! repository, which borrows a pooled connection per operation; mutating
//! paths run inside a service-layer transaction that threads one connection
//! through every repository call (`*_with` variants).

pub mod connection;
pub mod pool;
pub mod repository;
pub mod row;
pub mod sqlite;

pub use connection::{DbConnection, Params, Row};
pub use pool::{ConnectionPool, DbConfig, EngineKind, PooledConnection};
pub use repository::{Record, Repository};
pub use sqlite::SqliteConnection;
