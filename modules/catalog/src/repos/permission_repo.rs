//! Repository helpers for the `permissions` table.

use std::sync::Arc;

use persistence::{ConnectionPool, DbConnection, Params, Repository};
use platform_contracts::{ServiceResult, Value};

use crate::records::Permission;

pub const PERMISSIONS_TABLE: &str = "permissions";

pub fn repository(pool: Arc<ConnectionPool>) -> Repository<Permission> {
    Repository::new(pool, PERMISSIONS_TABLE)
}

pub fn find_by_name(
    repo: &Repository<Permission>,
    name: &str,
) -> ServiceResult<Option<Permission>> {
    let mut filter = Params::new();
    filter.insert("name".into(), name.into());
    Ok(repo.find(&filter)?.into_iter().next())
}

pub fn find_by_name_with(
    repo: &Repository<Permission>,
    conn: &mut dyn DbConnection,
    name: &str,
) -> ServiceResult<Option<Permission>> {
    let mut filter = Params::new();
    filter.insert("name".into(), name.into());
    Ok(repo.find_with(conn, &filter)?.into_iter().next())
}

/// Whether a permission with this name exists, optionally ignoring one id
/// (used when renaming).
pub fn name_taken(
    repo: &Repository<Permission>,
    name: &str,
    excluding_id: Option<&str>,
) -> ServiceResult<bool> {
    let existing = find_by_name(repo, name)?;
    Ok(match existing {
        Some(permission) => excluding_id != Some(permission.id.as_str()),
        None => false,
    })
}

pub fn list(
    repo: &Repository<Permission>,
    filter: &Params,
) -> ServiceResult<Vec<Permission>> {
    let mut permissions = repo.find(filter)?;
    if !filter.contains_key("status") {
        permissions.retain(|p| p.status != platform_contracts::EntityStatus::Deleted);
    }
    Ok(permissions)
}

pub fn count_by_module(repo: &Repository<Permission>, module: &str) -> ServiceResult<i64> {
    let mut filter = Params::new();
    filter.insert("module".into(), Value::Text(module.to_string()));
    repo.count(&filter)
}
