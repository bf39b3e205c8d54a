//! Repository helpers for the `roles` table.

use std::sync::Arc;

use persistence::{ConnectionPool, Params, Repository};
use platform_contracts::{EntityStatus, ServiceResult};

use crate::records::Role;

pub const ROLES_TABLE: &str = "roles";

pub fn repository(pool: Arc<ConnectionPool>) -> Repository<Role> {
    Repository::new(pool, ROLES_TABLE)
}

pub fn find_by_name(repo: &Repository<Role>, name: &str) -> ServiceResult<Option<Role>> {
    let mut filter = Params::new();
    filter.insert("name".into(), name.into());
    Ok(repo.find(&filter)?.into_iter().next())
}

pub fn name_taken(
    repo: &Repository<Role>,
    name: &str,
    excluding_id: Option<&str>,
) -> ServiceResult<bool> {
    let existing = find_by_name(repo, name)?;
    Ok(match existing {
        Some(role) => excluding_id != Some(role.id.as_str()),
        None => false,
    })
}

pub fn list(repo: &Repository<Role>, filter: &Params) -> ServiceResult<Vec<Role>> {
    let mut roles = repo.find(filter)?;
    if !filter.contains_key("status") {
        roles.retain(|r| r.status != EntityStatus::Deleted);
    }
    Ok(roles)
}
