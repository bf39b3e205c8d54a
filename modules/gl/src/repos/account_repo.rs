//! Repository helpers for the `gl_accounts` table.

use std::sync::Arc;

use persistence::{ConnectionPool, Params, Repository};
use platform_contracts::{EntityStatus, ServiceResult};

use crate::records::GlAccount;

pub const GL_ACCOUNTS_TABLE: &str = "gl_accounts";

pub fn repository(pool: Arc<ConnectionPool>) -> Repository<GlAccount> {
    Repository::new(pool, GL_ACCOUNTS_TABLE)
}

pub fn find_by_number(
    repo: &Repository<GlAccount>,
    account_number: &str,
) -> ServiceResult<Option<GlAccount>> {
    let mut filter = Params::new();
    filter.insert("account_number".into(), account_number.into());
    Ok(repo.find(&filter)?.into_iter().next())
}

/// Whether an account number is already taken, optionally ignoring one id.
pub fn number_taken(
    repo: &Repository<GlAccount>,
    account_number: &str,
    excluding_id: Option<&str>,
) -> ServiceResult<bool> {
    let existing = find_by_number(repo, account_number)?;
    Ok(match existing {
        Some(account) => excluding_id != Some(account.id.as_str()),
        None => false,
    })
}

pub fn list(repo: &Repository<GlAccount>, filter: &Params) -> ServiceResult<Vec<GlAccount>> {
    let mut accounts = repo.find(filter)?;
    if !filter.contains_key("status") {
        accounts.retain(|a| a.status != EntityStatus::Deleted);
    }
    Ok(accounts)
}

/// Walk the parent chain from `start_parent_id` upward, returning true when
/// `account_id` appears — i.e. making `start_parent_id` the parent of
/// `account_id` would close a cycle. A chain longer than the table (corrupt
/// data) terminates as a cycle rather than looping.
pub fn is_descendant_chain(
    repo: &Repository<GlAccount>,
    account_id: &str,
    start_parent_id: &str,
) -> ServiceResult<bool> {
    let mut seen = std::collections::HashSet::new();
    let mut cursor = Some(start_parent_id.to_string());

    while let Some(current) = cursor {
        if current == account_id {
            return Ok(true);
        }
        if !seen.insert(current.clone()) {
            tracing::warn!(account_id = %current, "parent chain loops; treating as cycle");
            return Ok(true);
        }
        cursor = repo
            .find_by_id(&current)?
            .and_then(|account| account.parent_account_id);
    }
    Ok(false)
}
