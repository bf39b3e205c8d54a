//! Role management, including the role→permission link mutations that drive
//! the cache invalidation protocol.

use std::sync::Arc;

use chrono::Utc;
use event_bus::{DomainEvent, EventKind};
use persistence::{ConnectionPool, Params, Record, Repository};
use platform_audit::{AuditActionType, AuditEntry};
use platform_contracts::{EntityStatus, LogSeverity, ServiceError, ServiceResult};
use serde_json::json;
use service_core::ServiceContext;
use uuid::Uuid;

use crate::records::{Permission, Role, RolePermissionLink};
use crate::repos::{permission_repo, role_permission_repo, role_repo};

const MODULE: &str = "Catalog";
const SUB_MODULE: &str = "Role";
const SERVICE: &str = "RoleService";

/// Input for creating a role.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}

pub struct RoleService {
    ctx: Arc<ServiceContext>,
    roles: Repository<Role>,
    permissions: Repository<Permission>,
    links: Repository<RolePermissionLink>,
}

impl RoleService {
    pub fn new(ctx: Arc<ServiceContext>, pool: Arc<ConnectionPool>) -> Self {
        Self {
            ctx,
            roles: role_repo::repository(Arc::clone(&pool)),
            permissions: permission_repo::repository(Arc::clone(&pool)),
            links: role_permission_repo::repository(pool),
        }
    }

    pub fn create_role(
        &self,
        input: NewRole,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Role> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.CreateRole",
            "You do not have permission to create roles.",
        )?;

        if input.name.is_empty() {
            return Err(ServiceError::invalid_input("role name is required"));
        }
        if role_repo::name_taken(&self.roles, &input.name, None)? {
            return Err(ServiceError::invalid_input(format!(
                "role name '{}' already exists",
                input.name
            )));
        }

        let role = Role {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            created_by: user_id.to_string(),
            updated_at: None,
            updated_by: None,
        };

        let committed = self.ctx.execute_transaction(SERVICE, "create_role", |conn| {
            self.roles.create_with(conn, &role)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("role create was not committed"));
        }

        self.ctx.publish(DomainEvent::new(
            EventKind::RoleCreated,
            json!({"role_id": role.id, "name": role.name}),
        ));
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Create,
                LogSeverity::Info,
                MODULE,
                SUB_MODULE,
            )
            .with_entity(&role.id, "Role", &role.name)
            .with_after(role.to_row()),
        );

        tracing::info!(role = %role.name, "role created");
        Ok(role)
    }

    pub fn update_role(
        &self,
        updated: Role,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Role> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.UpdateRole",
            "You do not have permission to update roles.",
        )?;

        let existing = self
            .roles
            .find_by_id(&updated.id)?
            .ok_or_else(|| ServiceError::not_found(format!("role '{}' not found", updated.id)))?;

        if updated.name.is_empty() {
            return Err(ServiceError::invalid_input("role name is required"));
        }
        if role_repo::name_taken(&self.roles, &updated.name, Some(&updated.id))? {
            return Err(ServiceError::invalid_input(format!(
                "role name '{}' already exists",
                updated.name
            )));
        }

        let mut role = updated;
        role.created_at = existing.created_at;
        role.created_by = existing.created_by.clone();
        role.updated_at = Some(Utc::now());
        role.updated_by = Some(user_id.to_string());

        let committed = self.ctx.execute_transaction(SERVICE, "update_role", |conn| {
            self.roles.update_with(conn, &role)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("role update was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.publish(DomainEvent::new(
            EventKind::RoleUpdated,
            json!({"role_id": role.id, "name": role.name}),
        ));
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Update,
                LogSeverity::Info,
                MODULE,
                SUB_MODULE,
            )
            .with_entity(&role.id, "Role", &role.name)
            .with_before(existing.to_row())
            .with_after(role.to_row()),
        );

        Ok(role)
    }

    pub fn update_role_status(
        &self,
        role_id: &str,
        new_status: EntityStatus,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.UpdateRole",
            "You do not have permission to change role status.",
        )?;

        let existing = self
            .roles
            .find_by_id(role_id)?
            .ok_or_else(|| ServiceError::not_found(format!("role '{role_id}' not found")))?;

        let mut role = existing.clone();
        role.status = new_status;
        role.updated_at = Some(Utc::now());
        role.updated_by = Some(user_id.to_string());

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "update_role_status", |conn| {
                self.roles.update_with(conn, &role)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("status update was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.publish(DomainEvent::new(
            EventKind::RoleStatusChanged,
            json!({
                "role_id": role.id,
                "name": role.name,
                "status": role.status.as_str(),
            }),
        ));
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::StatusChange,
                LogSeverity::Info,
                MODULE,
                SUB_MODULE,
            )
            .with_entity(&role.id, "Role", &role.name)
            .with_before(existing.to_row())
            .with_after(role.to_row()),
        );

        Ok(())
    }

    /// Remove a role and its permission links.
    pub fn delete_role(
        &self,
        role_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.DeleteRole",
            "You do not have permission to delete roles.",
        )?;

        let existing = self
            .roles
            .find_by_id(role_id)?
            .ok_or_else(|| ServiceError::not_found(format!("role '{role_id}' not found")))?;

        let committed = self.ctx.execute_transaction(SERVICE, "delete_role", |conn| {
            role_permission_repo::remove_links_for_role_with(&self.links, conn, role_id)?;
            self.roles.remove_with(conn, role_id)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("role delete was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Delete,
                LogSeverity::Warning,
                MODULE,
                SUB_MODULE,
            )
            .with_entity(role_id, "Role", &existing.name)
            .with_before(existing.to_row()),
        );

        Ok(())
    }

    /// Grant a permission to a role through the link table.
    pub fn assign_permission(
        &self,
        role_id: &str,
        permission_name: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.UpdateRole",
            "You do not have permission to change role grants.",
        )?;

        let role = self
            .roles
            .find_by_id(role_id)?
            .filter(|r| r.status != EntityStatus::Deleted)
            .ok_or_else(|| ServiceError::not_found(format!("role '{role_id}' not found")))?;
        permission_repo::find_by_name(&self.permissions, permission_name)?
            .filter(|p| p.status != EntityStatus::Deleted)
            .ok_or_else(|| {
                ServiceError::not_found(format!("permission '{permission_name}' not found"))
            })?;

        if role_permission_repo::find_link(&self.links, role_id, permission_name)?.is_some() {
            tracing::debug!(role_id, permission_name, "grant already present");
            return Ok(());
        }

        let link = RolePermissionLink {
            id: Uuid::new_v4().to_string(),
            role_id: role_id.to_string(),
            permission_name: permission_name.to_string(),
            status: EntityStatus::Active,
            created_at: Utc::now(),
            created_by: user_id.to_string(),
        };

        let committed = self.ctx.execute_transaction(SERVICE, "assign_permission", |conn| {
            self.links.create_with(conn, &link)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("grant was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Update,
                LogSeverity::Info,
                MODULE,
                SUB_MODULE,
            )
            .with_entity(role_id, "Role", &role.name)
            .with_change_reason(format!("granted '{permission_name}'")),
        );

        Ok(())
    }

    /// Revoke a permission from a role.
    pub fn revoke_permission(
        &self,
        role_id: &str,
        permission_name: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.UpdateRole",
            "You do not have permission to change role grants.",
        )?;

        let role = self
            .roles
            .find_by_id(role_id)?
            .ok_or_else(|| ServiceError::not_found(format!("role '{role_id}' not found")))?;

        let committed = self.ctx.execute_transaction(SERVICE, "revoke_permission", |conn| {
            role_permission_repo::remove_link_with(&self.links, conn, role_id, permission_name)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("revoke was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Update,
                LogSeverity::Info,
                MODULE,
                SUB_MODULE,
            )
            .with_entity(role_id, "Role", &role.name)
            .with_change_reason(format!("revoked '{permission_name}'")),
        );

        Ok(())
    }

    pub fn get_role_by_id(
        &self,
        role_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<Role>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Roles.View",
            "You do not have permission to view roles.",
        )?;
        let role = self.roles.find_by_id(role_id)?;
        Ok(role.filter(|r| r.status != EntityStatus::Deleted))
    }

    pub fn get_role_by_name(
        &self,
        name: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<Role>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Roles.View",
            "You do not have permission to view roles.",
        )?;
        let role = role_repo::find_by_name(&self.roles, name)?;
        Ok(role.filter(|r| r.status != EntityStatus::Deleted))
    }

    pub fn list_roles(
        &self,
        filter: &Params,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Vec<Role>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Roles.View",
            "You do not have permission to view roles.",
        )?;
        role_repo::list(&self.roles, filter)
    }

    /// Permission names currently granted to a role.
    pub fn role_permission_names(
        &self,
        role_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Vec<String>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Roles.View",
            "You do not have permission to view roles.",
        )?;
        role_permission_repo::permission_names_for_role(&self.links, role_id)
    }
}
