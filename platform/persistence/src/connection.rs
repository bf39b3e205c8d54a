use platform_contracts::{ServiceResult, ValueMap};

/// Named SQL parameters: placeholder name (without the `:` prefix) to value.
pub type Params = ValueMap;

/// One result row: column name to value.
pub type Row = ValueMap;

/// A single database session.
///
/// Implementations wrap one engine handle. A connection is owned by exactly
/// one thread between pool acquisition and release; the pool serialises
/// re-issue through [`reset`](DbConnection::reset).
///
/// All fallible operations report engine failures with the *DatabaseError*
/// kind and retain the engine message for [`last_error`](DbConnection::last_error).
pub trait DbConnection: Send {
    /// Open the underlying engine handle. Idempotent.
    fn open(&mut self) -> ServiceResult<()>;

    /// Release the engine handle. Idempotent; subsequent operations fail.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Run a non-query statement with named parameters.
    ///
    /// Unknown placeholders, parameters missing from the statement, and value
    /// variants the adapter cannot represent are *InvalidInput*.
    fn execute(&mut self, sql: &str, params: &Params) -> ServiceResult<()>;

    /// Run a query and materialise every row.
    fn query(&mut self, sql: &str, params: &Params) -> ServiceResult<Vec<Row>>;

    /// Begin a transaction. At most one may be open per connection; a second
    /// `begin` is a *DatabaseError*.
    fn begin_transaction(&mut self) -> ServiceResult<()>;

    fn commit_transaction(&mut self) -> ServiceResult<()>;

    fn rollback_transaction(&mut self) -> ServiceResult<()>;

    fn in_transaction(&self) -> bool;

    /// Roll back any in-flight transaction and clear per-connection state.
    /// Called by the pool before re-issue; safe on a closed connection.
    fn reset(&mut self);

    /// Engine message from the most recent failed operation.
    fn last_error(&self) -> Option<String>;
}
