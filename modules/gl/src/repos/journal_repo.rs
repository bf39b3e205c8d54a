//! Repository helpers for `journal_entries` and `journal_entry_details`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use persistence::{ConnectionPool, DbConnection, Params, Record, Repository};
use platform_contracts::{ServiceResult, Value};

use crate::records::{JournalEntry, JournalEntryDetail};

pub const JOURNAL_ENTRIES_TABLE: &str = "journal_entries";
pub const JOURNAL_ENTRY_DETAILS_TABLE: &str = "journal_entry_details";

pub fn entries_repository(pool: Arc<ConnectionPool>) -> Repository<JournalEntry> {
    Repository::new(pool, JOURNAL_ENTRIES_TABLE)
}

pub fn details_repository(pool: Arc<ConnectionPool>) -> Repository<JournalEntryDetail> {
    Repository::new(pool, JOURNAL_ENTRY_DETAILS_TABLE)
}

pub fn find_by_number(
    repo: &Repository<JournalEntry>,
    journal_number: &str,
) -> ServiceResult<Option<JournalEntry>> {
    let mut filter = Params::new();
    filter.insert("journal_number".into(), journal_number.into());
    Ok(repo.find(&filter)?.into_iter().next())
}

pub fn details_for_entry(
    repo: &Repository<JournalEntryDetail>,
    journal_entry_id: &str,
) -> ServiceResult<Vec<JournalEntryDetail>> {
    let mut filter = Params::new();
    filter.insert("journal_entry_id".into(), journal_entry_id.into());
    repo.find(&filter)
}

pub fn details_for_entry_with(
    repo: &Repository<JournalEntryDetail>,
    conn: &mut dyn DbConnection,
    journal_entry_id: &str,
) -> ServiceResult<Vec<JournalEntryDetail>> {
    let mut filter = Params::new();
    filter.insert("journal_entry_id".into(), journal_entry_id.into());
    repo.find_with(conn, &filter)
}

pub fn remove_details_for_entry_with(
    repo: &Repository<JournalEntryDetail>,
    conn: &mut dyn DbConnection,
    journal_entry_id: &str,
) -> ServiceResult<()> {
    let mut params = Params::new();
    params.insert("journal_entry_id".into(), journal_entry_id.into());
    repo.execute_with(
        conn,
        "DELETE FROM journal_entry_details WHERE journal_entry_id = :journal_entry_id",
        &params,
    )
}

/// Posted entries whose posting date falls in the window. `start` of `None`
/// reads from the beginning of time (position reports).
pub fn posted_entries_in_window(
    repo: &Repository<JournalEntry>,
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
) -> ServiceResult<Vec<JournalEntry>> {
    let mut sql = String::from(
        "SELECT * FROM journal_entries WHERE is_posted = :is_posted AND posting_date <= :end_date",
    );
    let mut params = Params::new();
    params.insert("is_posted".into(), Value::Bool(true));
    params.insert("end_date".into(), end.into());
    if let Some(start) = start {
        sql.push_str(" AND posting_date >= :start_date");
        params.insert("start_date".into(), start.into());
    }
    sql.push_str(" ORDER BY posting_date");

    let rows = repo.query_rows(&sql, &params)?;
    rows.iter().map(JournalEntry::from_row).collect()
}

/// Summed posted activity per account over the window:
/// `(account_id, debit_total, credit_total)`.
pub fn posted_activity_by_account(
    repo: &Repository<JournalEntry>,
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
) -> ServiceResult<Vec<(String, f64, f64)>> {
    let mut sql = String::from(
        "SELECT d.gl_account_id AS account_id, \
                SUM(d.debit_amount) AS debit_total, \
                SUM(d.credit_amount) AS credit_total \
         FROM journal_entry_details d \
         JOIN journal_entries e ON e.id = d.journal_entry_id \
         WHERE e.is_posted = :is_posted AND e.posting_date <= :end_date",
    );
    let mut params = Params::new();
    params.insert("is_posted".into(), Value::Bool(true));
    params.insert("end_date".into(), end.into());
    if let Some(start) = start {
        sql.push_str(" AND e.posting_date >= :start_date");
        params.insert("start_date".into(), start.into());
    }
    sql.push_str(" GROUP BY d.gl_account_id");

    let rows = repo.query_rows(&sql, &params)?;
    rows.iter()
        .map(|row| {
            Ok((
                persistence::row::get_text(row, "account_id")?,
                persistence::row::get_f64(row, "debit_total")?,
                persistence::row::get_f64(row, "credit_total")?,
            ))
        })
        .collect()
}

/// Whether any posted entry references the account; guards account deletion.
pub fn account_has_posted_activity(
    repo: &Repository<JournalEntry>,
    gl_account_id: &str,
) -> ServiceResult<bool> {
    let sql = "SELECT COUNT(*) AS n \
               FROM journal_entry_details d \
               JOIN journal_entries e ON e.id = d.journal_entry_id \
               WHERE e.is_posted = :is_posted AND d.gl_account_id = :gl_account_id";
    let mut params = Params::new();
    params.insert("is_posted".into(), Value::Bool(true));
    params.insert("gl_account_id".into(), gl_account_id.into());

    let rows = repo.query_rows(sql, &params)?;
    let count = rows
        .first()
        .and_then(|row| row.get("n"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    Ok(count > 0)
}
