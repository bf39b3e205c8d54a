//! Repository helpers for the `role_permissions` link table.
//!
//! The link references permissions by *name*; the join back to `permissions`
//! filters both sides to Active so that disabling either end revokes the
//! grant without touching the link rows.

use std::sync::Arc;

use persistence::row::get_text;
use persistence::{ConnectionPool, DbConnection, Params, Repository};
use platform_contracts::{EntityStatus, ServiceResult, Value};

use crate::records::RolePermissionLink;

pub const ROLE_PERMISSIONS_TABLE: &str = "role_permissions";

pub fn repository(pool: Arc<ConnectionPool>) -> Repository<RolePermissionLink> {
    Repository::new(pool, ROLE_PERMISSIONS_TABLE)
}

/// Permission names granted to a role through Active links to Active
/// permissions.
pub fn permission_names_for_role(
    repo: &Repository<RolePermissionLink>,
    role_id: &str,
) -> ServiceResult<Vec<String>> {
    let sql = "SELECT p.name AS permission_name \
               FROM role_permissions rp \
               JOIN permissions p ON p.name = rp.permission_name \
               WHERE rp.role_id = :role_id \
                 AND rp.status = :link_status \
                 AND p.status = :permission_status";
    let mut params = Params::new();
    params.insert("role_id".into(), role_id.into());
    params.insert("link_status".into(), Value::Int(EntityStatus::Active.code()));
    params.insert(
        "permission_status".into(),
        Value::Int(EntityStatus::Active.code()),
    );

    let rows = repo.query_rows(sql, &params)?;
    rows.iter()
        .map(|row| get_text(row, "permission_name"))
        .collect()
}

pub fn find_link(
    repo: &Repository<RolePermissionLink>,
    role_id: &str,
    permission_name: &str,
) -> ServiceResult<Option<RolePermissionLink>> {
    let mut filter = Params::new();
    filter.insert("role_id".into(), role_id.into());
    filter.insert("permission_name".into(), permission_name.into());
    Ok(repo.find(&filter)?.into_iter().next())
}

pub fn remove_link_with(
    repo: &Repository<RolePermissionLink>,
    conn: &mut dyn DbConnection,
    role_id: &str,
    permission_name: &str,
) -> ServiceResult<()> {
    let sql = "DELETE FROM role_permissions \
               WHERE role_id = :role_id AND permission_name = :permission_name";
    let mut params = Params::new();
    params.insert("role_id".into(), role_id.into());
    params.insert("permission_name".into(), permission_name.into());
    repo.execute_with(conn, sql, &params)
}

pub fn remove_links_for_role_with(
    repo: &Repository<RolePermissionLink>,
    conn: &mut dyn DbConnection,
    role_id: &str,
) -> ServiceResult<()> {
    let mut params = Params::new();
    params.insert("role_id".into(), role_id.into());
    repo.execute_with(
        conn,
        "DELETE FROM role_permissions WHERE role_id = :role_id",
        &params,
    )
}

pub fn remove_links_for_permission_with(
    repo: &Repository<RolePermissionLink>,
    conn: &mut dyn DbConnection,
    permission_name: &str,
) -> ServiceResult<()> {
    let mut params = Params::new();
    params.insert("permission_name".into(), permission_name.into());
    repo.execute_with(
        conn,
        "DELETE FROM role_permissions WHERE permission_name = :permission_name",
        &params,
    )
}
