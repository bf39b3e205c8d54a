//! Typed readers over result rows.
//!
//! `from_row` implementations use these to keep column decoding uniform:
//! a missing or mistyped column is a *DatabaseError* naming the column, which
//! in practice means the schema and the record projection have drifted.

use chrono::{DateTime, Utc};
use platform_contracts::{EntityStatus, ServiceError, ServiceResult, Value};

use crate::connection::Row;

fn missing(column: &str) -> ServiceError {
    ServiceError::database(format!("row is missing column '{column}'"))
}

fn mistyped(column: &str) -> ServiceError {
    ServiceError::database(format!("column '{column}' has an unexpected type"))
}

pub fn get_text(row: &Row, column: &str) -> ServiceResult<String> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mistyped(column))
}

pub fn get_opt_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.as_str()).map(str::to_string)
}

pub fn get_i64(row: &Row, column: &str) -> ServiceResult<i64> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    value.as_i64().ok_or_else(|| mistyped(column))
}

pub fn get_opt_i64(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(Value::as_i64)
}

pub fn get_f64(row: &Row, column: &str) -> ServiceResult<f64> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    value.as_f64().ok_or_else(|| mistyped(column))
}

pub fn get_bool(row: &Row, column: &str) -> ServiceResult<bool> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    value.as_bool().ok_or_else(|| mistyped(column))
}

pub fn get_timestamp(row: &Row, column: &str) -> ServiceResult<DateTime<Utc>> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    value.as_timestamp().ok_or_else(|| mistyped(column))
}

pub fn get_opt_timestamp(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    row.get(column).and_then(Value::as_timestamp)
}

/// Read the conventional `status` column; absent or unreadable yields
/// [`EntityStatus::Unknown`].
pub fn get_status(row: &Row) -> EntityStatus {
    get_opt_i64(row, "status")
        .map(EntityStatus::from_code)
        .unwrap_or(EntityStatus::Unknown)
}
