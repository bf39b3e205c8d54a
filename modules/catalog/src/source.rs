//! Production [`RolePermissionSource`] backed by the catalog tables.

use std::collections::HashSet;
use std::sync::Arc;

use persistence::{ConnectionPool, Repository};
use platform_contracts::{EntityStatus, ServiceResult};
use security::RolePermissionSource;

use crate::records::{Role, RolePermissionLink};
use crate::repos::{role_permission_repo, role_repo};

/// Loads a role's permission names from storage for the authorization engine.
///
/// A role that does not exist or is not Active yields no permissions; the
/// link join already excludes non-Active permissions.
pub struct CatalogRolePermissionSource {
    roles: Repository<Role>,
    links: Repository<RolePermissionLink>,
}

impl CatalogRolePermissionSource {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            roles: role_repo::repository(Arc::clone(&pool)),
            links: role_permission_repo::repository(pool),
        }
    }
}

impl RolePermissionSource for CatalogRolePermissionSource {
    fn load_role_permissions(&self, role_id: &str) -> ServiceResult<HashSet<String>> {
        let role = self.roles.find_by_id(role_id)?;
        match role {
            Some(role) if role.status == EntityStatus::Active => {}
            _ => {
                tracing::warn!(role_id, "role missing or not active; no permissions");
                return Ok(HashSet::new());
            }
        }

        let names = role_permission_repo::permission_names_for_role(&self.links, role_id)?;
        tracing::debug!(role_id, count = names.len(), "loaded role permissions");
        Ok(names.into_iter().collect())
    }
}
