//! Repository helpers for the `gl_account_balances` table.
//!
//! One row per account, created lazily by the posting routine; nothing else
//! writes here.

use std::sync::Arc;

use persistence::{ConnectionPool, DbConnection, Params, Repository};
use platform_contracts::ServiceResult;

use crate::records::GlAccountBalance;

pub const GL_ACCOUNT_BALANCES_TABLE: &str = "gl_account_balances";

pub fn repository(pool: Arc<ConnectionPool>) -> Repository<GlAccountBalance> {
    Repository::new(pool, GL_ACCOUNT_BALANCES_TABLE)
}

pub fn find_by_account(
    repo: &Repository<GlAccountBalance>,
    gl_account_id: &str,
) -> ServiceResult<Option<GlAccountBalance>> {
    let mut filter = Params::new();
    filter.insert("gl_account_id".into(), gl_account_id.into());
    Ok(repo.find(&filter)?.into_iter().next())
}

pub fn find_by_account_with(
    repo: &Repository<GlAccountBalance>,
    conn: &mut dyn DbConnection,
    gl_account_id: &str,
) -> ServiceResult<Option<GlAccountBalance>> {
    let mut filter = Params::new();
    filter.insert("gl_account_id".into(), gl_account_id.into());
    Ok(repo.find_with(conn, &filter)?.into_iter().next())
}

/// A balance row existing at all marks the account as used by posting.
pub fn exists_for_account(
    repo: &Repository<GlAccountBalance>,
    gl_account_id: &str,
) -> ServiceResult<bool> {
    let mut filter = Params::new();
    filter.insert("gl_account_id".into(), gl_account_id.into());
    Ok(repo.count(&filter)? > 0)
}
