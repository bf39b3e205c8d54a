//! SQLite adapter for the [`DbConnection`] trait.
//!
//! Statements use `:name` placeholders; binding walks the statement's declared
//! parameters so that a missing binding and a surplus binding are both caught
//! before execution.

use std::time::Duration;

use platform_contracts::{ServiceError, ServiceResult, Value};
use rusqlite::types::ValueRef;

use crate::connection::{DbConnection, Params, Row};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One SQLite session over a database file (or `:memory:`).
pub struct SqliteConnection {
    path: String,
    conn: Option<rusqlite::Connection>,
    in_tx: bool,
    last_error: Option<String>,
}

impl SqliteConnection {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: None,
            in_tx: false,
            last_error: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn fail(&mut self, message: String) -> ServiceError {
        self.last_error = Some(message.clone());
        ServiceError::database(message)
    }

    fn not_open(&mut self, op: &str) -> ServiceError {
        self.fail(format!("connection is not open ({op})"))
    }

    fn bind_all(stmt: &mut rusqlite::Statement<'_>, params: &Params) -> ServiceResult<()> {
        // Every declared placeholder must have a binding.
        for index in 1..=stmt.parameter_count() {
            let name = stmt
                .parameter_name(index)
                .map(|n| n.trim_start_matches(':').to_string())
                .unwrap_or_default();
            if !params.contains_key(&name) {
                return Err(ServiceError::invalid_input(format!(
                    "missing value for placeholder ':{name}'"
                )));
            }
        }

        for (name, value) in params {
            let placeholder = format!(":{name}");
            let index = stmt
                .parameter_index(&placeholder)
                .map_err(|e| ServiceError::database(e.to_string()))?
                .ok_or_else(|| {
                    ServiceError::invalid_input(format!(
                        "placeholder '{placeholder}' not present in statement"
                    ))
                })?;

            let bound = match value {
                Value::Null => stmt.raw_bind_parameter(index, rusqlite::types::Null),
                Value::Int(v) => stmt.raw_bind_parameter(index, *v),
                Value::Float(v) => stmt.raw_bind_parameter(index, *v),
                Value::Bool(v) => stmt.raw_bind_parameter(index, i64::from(*v)),
                Value::Text(v) => stmt.raw_bind_parameter(index, v.as_str()),
                Value::Timestamp(v) => {
                    stmt.raw_bind_parameter(index, Value::timestamp_string(*v))
                }
                Value::Map(_) | Value::List(_) => {
                    return Err(ServiceError::invalid_input(format!(
                        "parameter '{name}' has a type the adapter cannot bind"
                    )))
                }
            };
            bound.map_err(|e| ServiceError::database(e.to_string()))?;
        }
        Ok(())
    }

    fn decode(column: &str, value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Int(v),
            ValueRef::Real(v) => Value::Float(v),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(_) => {
                tracing::warn!(column, "blob column is not supported; reading as NULL");
                Value::Null
            }
        }
    }

    fn run_batch(&mut self, sql: &'static str, op: &str) -> ServiceResult<()> {
        let conn = match self.conn.as_ref() {
            Some(conn) => conn,
            None => return Err(self.not_open(op)),
        };
        if let Err(e) = conn.execute_batch(sql) {
            return Err(self.fail(format!("{op} failed: {e}")));
        }
        Ok(())
    }
}

impl DbConnection for SqliteConnection {
    fn open(&mut self) -> ServiceResult<()> {
        if self.conn.is_some() {
            tracing::debug!(path = %self.path, "connection already open");
            return Ok(());
        }
        let conn = rusqlite::Connection::open(&self.path)
            .map_err(|e| self.fail(format!("failed to open database '{}': {e}", self.path)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| self.fail(format!("failed to set busy timeout: {e}")))?;
        self.conn = Some(conn);
        tracing::debug!(path = %self.path, "database connection opened");
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.in_tx = false;
            if let Err((_conn, e)) = conn.close() {
                tracing::error!(path = %self.path, error = %e, "failed to close connection");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn execute(&mut self, sql: &str, params: &Params) -> ServiceResult<()> {
        let result = match self.conn.as_ref() {
            None => return Err(self.not_open("execute")),
            Some(conn) => conn
                .prepare(sql)
                .map_err(|e| ServiceError::database(format!("prepare failed: {e}")))
                .and_then(|mut stmt| {
                    Self::bind_all(&mut stmt, params)?;
                    stmt.raw_execute()
                        .map(|_rows| ())
                        .map_err(|e| ServiceError::database(format!("execute failed: {e}")))
                }),
        };
        result.map_err(|e| {
            self.last_error = Some(e.message.clone());
            tracing::error!(sql, error = %e, "statement execution failed");
            e
        })
    }

    fn query(&mut self, sql: &str, params: &Params) -> ServiceResult<Vec<Row>> {
        let result = match self.conn.as_ref() {
            None => return Err(self.not_open("query")),
            Some(conn) => conn
                .prepare(sql)
                .map_err(|e| ServiceError::database(format!("prepare failed: {e}")))
                .and_then(|mut stmt| {
                    Self::bind_all(&mut stmt, params)?;
                    let columns: Vec<String> =
                        stmt.column_names().iter().map(|c| c.to_string()).collect();
                    let mut rows = stmt.raw_query();
                    let mut out = Vec::new();
                    loop {
                        match rows.next() {
                            Ok(Some(db_row)) => {
                                let mut row = Row::new();
                                for (i, column) in columns.iter().enumerate() {
                                    let value = db_row.get_ref(i).map_err(|e| {
                                        ServiceError::database(format!("column read failed: {e}"))
                                    })?;
                                    row.insert(column.clone(), Self::decode(column, value));
                                }
                                out.push(row);
                            }
                            Ok(None) => break,
                            Err(e) => {
                                return Err(ServiceError::database(format!("query failed: {e}")))
                            }
                        }
                    }
                    Ok(out)
                }),
        };
        result.map_err(|e| {
            self.last_error = Some(e.message.clone());
            tracing::error!(sql, error = %e, "query execution failed");
            e
        })
    }

    fn begin_transaction(&mut self) -> ServiceResult<()> {
        if self.conn.is_none() {
            return Err(self.not_open("begin_transaction"));
        }
        if self.in_tx {
            return Err(self.fail("transaction already open on this connection".to_string()));
        }
        self.run_batch("BEGIN;", "begin_transaction")?;
        self.in_tx = true;
        Ok(())
    }

    fn commit_transaction(&mut self) -> ServiceResult<()> {
        if self.conn.is_none() {
            return Err(self.not_open("commit_transaction"));
        }
        if !self.in_tx {
            return Err(self.fail("no open transaction to commit".to_string()));
        }
        self.run_batch("COMMIT;", "commit_transaction")?;
        self.in_tx = false;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> ServiceResult<()> {
        if self.conn.is_none() {
            return Err(self.not_open("rollback_transaction"));
        }
        if !self.in_tx {
            return Err(self.fail("no open transaction to roll back".to_string()));
        }
        self.run_batch("ROLLBACK;", "rollback_transaction")?;
        self.in_tx = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    fn reset(&mut self) {
        if self.in_tx {
            if let Err(e) = self.rollback_transaction() {
                tracing::warn!(error = %e, "rollback during reset failed");
            }
            self.in_tx = false;
        }
        self.last_error = None;
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_contracts::ErrorKind;

    fn open_memory() -> SqliteConnection {
        let mut conn = SqliteConnection::new(":memory:");
        conn.open().unwrap();
        conn.execute(
            "CREATE TABLE items (id TEXT PRIMARY KEY, name TEXT NOT NULL, qty INTEGER)",
            &Params::new(),
        )
        .unwrap();
        conn
    }

    fn insert_params(id: &str, name: &str, qty: i64) -> Params {
        let mut params = Params::new();
        params.insert("id".into(), id.into());
        params.insert("name".into(), name.into());
        params.insert("qty".into(), qty.into());
        params
    }

    #[test]
    fn execute_and_query_round_trip() {
        let mut conn = open_memory();
        conn.execute(
            "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
            &insert_params("i-1", "bolt", 12),
        )
        .unwrap();

        let mut filter = Params::new();
        filter.insert("id".into(), "i-1".into());
        let rows = conn
            .query("SELECT id, name, qty FROM items WHERE id = :id", &filter)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"].as_str(), Some("bolt"));
        assert_eq!(rows[0]["qty"].as_i64(), Some(12));
    }

    #[test]
    fn unknown_placeholder_is_invalid_input() {
        let mut conn = open_memory();
        let mut params = insert_params("i-1", "bolt", 1);
        params.insert("surplus".into(), Value::Int(9));
        let err = conn
            .execute(
                "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
                &params,
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_placeholder_is_invalid_input() {
        let mut conn = open_memory();
        let mut params = Params::new();
        params.insert("id".into(), "i-1".into());
        let err = conn
            .execute(
                "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
                &params,
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert!(err.message.contains("name") || err.message.contains("qty"));
    }

    #[test]
    fn unbindable_value_is_invalid_input() {
        let mut conn = open_memory();
        let mut params = insert_params("i-1", "bolt", 1);
        params.insert("qty".into(), Value::Map(Default::default()));
        let err = conn
            .execute(
                "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
                &params,
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn second_begin_is_database_error() {
        let mut conn = open_memory();
        conn.begin_transaction().unwrap();
        let err = conn.begin_transaction().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DatabaseError);
        conn.rollback_transaction().unwrap();
    }

    #[test]
    fn rollback_discards_writes() {
        let mut conn = open_memory();
        conn.begin_transaction().unwrap();
        conn.execute(
            "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
            &insert_params("i-1", "bolt", 1),
        )
        .unwrap();
        conn.rollback_transaction().unwrap();

        let rows = conn.query("SELECT id FROM items", &Params::new()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn reset_rolls_back_open_transaction() {
        let mut conn = open_memory();
        conn.begin_transaction().unwrap();
        conn.execute(
            "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
            &insert_params("i-1", "bolt", 1),
        )
        .unwrap();
        conn.reset();
        assert!(!conn.in_transaction());
        let rows = conn.query("SELECT id FROM items", &Params::new()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn reset_on_closed_connection_is_noop() {
        let mut conn = SqliteConnection::new(":memory:");
        conn.reset();
        assert!(!conn.is_open());
    }

    #[test]
    fn operations_on_closed_connection_fail() {
        let mut conn = open_memory();
        conn.close();
        let err = conn.query("SELECT 1", &Params::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DatabaseError);
        assert!(conn.last_error().unwrap().contains("not open"));
    }

    #[test]
    fn last_error_captures_engine_message() {
        let mut conn = open_memory();
        let err = conn
            .execute("INSERT INTO no_such_table VALUES (1)", &Params::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DatabaseError);
        assert!(conn.last_error().is_some());
    }

    #[test]
    fn null_round_trips() {
        let mut conn = open_memory();
        let mut params = insert_params("i-1", "bolt", 0);
        params.insert("qty".into(), Value::Null);
        conn.execute(
            "INSERT INTO items (id, name, qty) VALUES (:id, :name, :qty)",
            &params,
        )
        .unwrap();
        let rows = conn.query("SELECT qty FROM items", &Params::new()).unwrap();
        assert!(rows[0]["qty"].is_null());
    }
}
