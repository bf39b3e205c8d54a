//! Generic record repository.
//!
//! A [`Repository`] is typed over one business record and bound to one table.
//! It builds parameterised SQL from the record's row projection, acquires a
//! pooled connection per operation (releasing it on every exit path), and
//! translates engine failures into the *DatabaseError* kind. It knows nothing
//! about permissions or auditing — those belong to the service layer — and it
//! does not model relationships: join tables get their own repository and use
//! the raw-query escape hatch.

use std::marker::PhantomData;
use std::sync::Arc;

use platform_contracts::{ServiceError, ServiceResult, Value};

use crate::connection::{DbConnection, Params, Row};
use crate::pool::ConnectionPool;

/// A business record that can be projected to and from a relational row.
///
/// `from_row(to_row(r))` must reproduce `r` modulo the timestamp precision
/// stored by the engine.
pub trait Record: Clone + Send + Sized {
    /// Stable opaque identifier, assigned at creation, immutable.
    fn id(&self) -> &str;

    /// Project the record into column-name keyed values.
    fn to_row(&self) -> Row;

    /// Rebuild the record from a result row.
    fn from_row(row: &Row) -> ServiceResult<Self>;
}

/// Uniform CRUD/query primitives over one table.
///
/// Every operation exists in two flavors: the plain form acquires a pooled
/// connection for the duration of the call; the `*_with` form runs on a
/// caller-supplied connection so services can compose several repository
/// calls inside one transaction.
pub struct Repository<T: Record> {
    pool: Arc<ConnectionPool>,
    table: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Repository<T> {
    pub fn new(pool: Arc<ConnectionPool>, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    fn with_conn<R>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut dyn DbConnection) -> ServiceResult<R>,
    ) -> ServiceResult<R> {
        let guard = self.pool.acquire().map_err(|e| {
            tracing::error!(table = %self.table, operation, error = %e, "failed to acquire connection");
            e
        })?;
        guard.with(f)
    }

    pub fn create(&self, record: &T) -> ServiceResult<()> {
        self.with_conn("create", |conn| self.create_with(conn, record))
    }

    pub fn create_with(&self, conn: &mut dyn DbConnection, record: &T) -> ServiceResult<()> {
        let row = record.to_row();
        if row.is_empty() {
            return Err(ServiceError::invalid_input(format!(
                "refusing to insert an empty projection into '{}'",
                self.table
            )));
        }

        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        tracing::debug!(table = %self.table, operation = "create", id = record.id());
        conn.execute(&sql, &row)
    }

    /// Fetch records matching the filter (column = value, ANDed). An empty
    /// filter returns every row.
    pub fn find(&self, filter: &Params) -> ServiceResult<Vec<T>> {
        self.with_conn("find", |conn| self.find_with(conn, filter))
    }

    pub fn find_with(&self, conn: &mut dyn DbConnection, filter: &Params) -> ServiceResult<Vec<T>> {
        let (where_clause, params) = build_where(filter);
        let sql = format!("SELECT * FROM {}{}", self.table, where_clause);

        tracing::debug!(table = %self.table, operation = "find", criteria = filter.len());
        let rows = conn.query(&sql, &params)?;
        rows.iter().map(T::from_row).collect()
    }

    pub fn find_by_id(&self, id: &str) -> ServiceResult<Option<T>> {
        self.with_conn("find_by_id", |conn| self.find_by_id_with(conn, id))
    }

    pub fn find_by_id_with(
        &self,
        conn: &mut dyn DbConnection,
        id: &str,
    ) -> ServiceResult<Option<T>> {
        let mut filter = Params::new();
        filter.insert("id".to_string(), Value::Text(id.to_string()));
        Ok(self.find_with(conn, &filter)?.into_iter().next())
    }

    pub fn update(&self, record: &T) -> ServiceResult<()> {
        self.with_conn("update", |conn| self.update_with(conn, record))
    }

    pub fn update_with(&self, conn: &mut dyn DbConnection, record: &T) -> ServiceResult<()> {
        let row = record.to_row();
        if row.is_empty() || record.id().is_empty() {
            return Err(ServiceError::invalid_input(format!(
                "update on '{}' requires a non-empty projection with an id",
                self.table
            )));
        }

        let assignments: Vec<String> = row
            .keys()
            .filter(|c| c.as_str() != "id")
            .map(|c| format!("{c} = :{c}"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = :id",
            self.table,
            assignments.join(", ")
        );

        tracing::debug!(table = %self.table, operation = "update", id = record.id());
        conn.execute(&sql, &row)
    }

    pub fn remove(&self, id: &str) -> ServiceResult<()> {
        self.with_conn("remove", |conn| self.remove_with(conn, id))
    }

    pub fn remove_with(&self, conn: &mut dyn DbConnection, id: &str) -> ServiceResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = :id", self.table);
        let mut params = Params::new();
        params.insert("id".to_string(), Value::Text(id.to_string()));

        tracing::debug!(table = %self.table, operation = "remove", id);
        conn.execute(&sql, &params)
    }

    pub fn count(&self, filter: &Params) -> ServiceResult<i64> {
        self.with_conn("count", |conn| self.count_with(conn, filter))
    }

    pub fn count_with(&self, conn: &mut dyn DbConnection, filter: &Params) -> ServiceResult<i64> {
        let (where_clause, params) = build_where(filter);
        let sql = format!(
            "SELECT COUNT(*) AS record_count FROM {}{}",
            self.table, where_clause
        );

        let rows = conn.query(&sql, &params)?;
        let count = rows
            .first()
            .and_then(|row| row.get("record_count"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count)
    }

    /// Escape hatch for join queries and report shapes the generic layer does
    /// not model. Parameterised like everything else.
    pub fn query_rows(&self, sql: &str, params: &Params) -> ServiceResult<Vec<Row>> {
        self.with_conn("query_rows", |conn| conn.query(sql, params))
    }

    pub fn query_rows_with(
        &self,
        conn: &mut dyn DbConnection,
        sql: &str,
        params: &Params,
    ) -> ServiceResult<Vec<Row>> {
        conn.query(sql, params)
    }

    pub fn execute_with(
        &self,
        conn: &mut dyn DbConnection,
        sql: &str,
        params: &Params,
    ) -> ServiceResult<()> {
        conn.execute(sql, params)
    }
}

fn build_where(filter: &Params) -> (String, Params) {
    if filter.is_empty() {
        return (String::new(), Params::new());
    }
    let conditions: Vec<String> = filter.keys().map(|c| format!("{c} = :{c}")).collect();
    (
        format!(" WHERE {}", conditions.join(" AND ")),
        filter.clone(),
    )
}
