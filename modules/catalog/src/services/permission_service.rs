//! Permission management.
//!
//! Every mutation commits first, then reloads the authorization cache and
//! (where an event is defined) publishes to the bus, then records its audit
//! entry — so a rolled-back change can never be observed anywhere.

use std::sync::Arc;

use chrono::Utc;
use event_bus::{DomainEvent, EventKind};
use persistence::{ConnectionPool, Params, Record, Repository};
use platform_audit::{AuditActionType, AuditEntry};
use platform_contracts::{EntityStatus, LogSeverity, ServiceError, ServiceResult};
use serde_json::json;
use service_core::ServiceContext;
use uuid::Uuid;

use crate::records::{Permission, RolePermissionLink};
use crate::repos::{permission_repo, role_permission_repo};

const MODULE: &str = "Catalog";
const SUB_MODULE: &str = "Permission";
const SERVICE: &str = "PermissionService";

/// Input for creating a permission.
#[derive(Debug, Clone)]
pub struct NewPermission {
    pub name: String,
    pub module: String,
    pub action: String,
    pub description: Option<String>,
}

pub struct PermissionService {
    ctx: Arc<ServiceContext>,
    permissions: Repository<Permission>,
    links: Repository<RolePermissionLink>,
}

impl PermissionService {
    pub fn new(ctx: Arc<ServiceContext>, pool: Arc<ConnectionPool>) -> Self {
        Self {
            ctx,
            permissions: permission_repo::repository(Arc::clone(&pool)),
            links: role_permission_repo::repository(pool),
        }
    }

    pub fn create_permission(
        &self,
        input: NewPermission,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Permission> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.CreatePermission",
            "You do not have permission to create permissions.",
        )?;

        validate_permission_shape(&input.name, &input.module, &input.action)?;
        if permission_repo::name_taken(&self.permissions, &input.name, None)? {
            return Err(ServiceError::invalid_input(format!(
                "permission name '{}' already exists",
                input.name
            )));
        }

        let permission = Permission {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            module: input.module,
            action: input.action,
            description: input.description,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            created_by: user_id.to_string(),
            updated_at: None,
            updated_by: None,
        };

        let committed = self.ctx.execute_transaction(SERVICE, "create_permission", |conn| {
            self.permissions.create_with(conn, &permission)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("permission create was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.publish(DomainEvent::new(
            EventKind::PermissionCreated,
            json!({"permission_id": permission.id, "name": permission.name}),
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
            .with_entity(&permission.id, "Permission", &permission.name)
            .with_after(permission.to_row()),
        );

        tracing::info!(permission = %permission.name, "permission created");
        Ok(permission)
    }

    pub fn update_permission(
        &self,
        updated: Permission,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Permission> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.UpdatePermission",
            "You do not have permission to update permissions.",
        )?;

        let existing = self
            .permissions
            .find_by_id(&updated.id)?
            .ok_or_else(|| ServiceError::not_found(format!("permission '{}' not found", updated.id)))?;

        validate_permission_shape(&updated.name, &updated.module, &updated.action)?;
        if permission_repo::name_taken(&self.permissions, &updated.name, Some(&updated.id))? {
            return Err(ServiceError::invalid_input(format!(
                "permission name '{}' already exists",
                updated.name
            )));
        }

        let mut permission = updated;
        permission.created_at = existing.created_at;
        permission.created_by = existing.created_by.clone();
        permission.updated_at = Some(Utc::now());
        permission.updated_by = Some(user_id.to_string());

        let renamed = existing.name != permission.name;
        let committed = self.ctx.execute_transaction(SERVICE, "update_permission", |conn| {
            // Links key on the permission name; a rename must follow them.
            if renamed {
                let sql = "UPDATE role_permissions SET permission_name = :new_name \
                           WHERE permission_name = :old_name";
                let mut params = Params::new();
                params.insert("new_name".into(), permission.name.clone().into());
                params.insert("old_name".into(), existing.name.clone().into());
                self.links.execute_with(conn, sql, &params)?;
            }
            self.permissions.update_with(conn, &permission)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("permission update was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.publish(DomainEvent::new(
            EventKind::PermissionUpdated,
            json!({"permission_id": permission.id, "name": permission.name}),
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
            .with_entity(&permission.id, "Permission", &permission.name)
            .with_before(existing.to_row())
            .with_after(permission.to_row()),
        );

        Ok(permission)
    }

    pub fn update_permission_status(
        &self,
        permission_id: &str,
        new_status: EntityStatus,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.UpdatePermission",
            "You do not have permission to change permission status.",
        )?;

        let existing = self
            .permissions
            .find_by_id(permission_id)?
            .ok_or_else(|| ServiceError::not_found(format!("permission '{permission_id}' not found")))?;

        let mut permission = existing.clone();
        permission.status = new_status;
        permission.updated_at = Some(Utc::now());
        permission.updated_by = Some(user_id.to_string());

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "update_permission_status", |conn| {
                self.permissions.update_with(conn, &permission)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("status update was not committed"));
        }

        self.ctx.authorization().reload_cache();
        self.ctx.publish(DomainEvent::new(
            EventKind::PermissionStatusChanged,
            json!({
                "permission_id": permission.id,
                "name": permission.name,
                "status": permission.status.as_str(),
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
            .with_entity(&permission.id, "Permission", &permission.name)
            .with_before(existing.to_row())
            .with_after(permission.to_row()),
        );

        Ok(())
    }

    /// Remove a permission and every link that grants it.
    ///
    /// The wildcard permissions are load-bearing for the whole system and can
    /// never be removed.
    pub fn delete_permission(
        &self,
        permission_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.DeletePermission",
            "You do not have permission to delete permissions.",
        )?;

        let existing = self
            .permissions
            .find_by_id(permission_id)?
            .ok_or_else(|| ServiceError::not_found(format!("permission '{permission_id}' not found")))?;

        if existing.name == security::MANAGE_ALL || existing.name == security::READ_ALL {
            return Err(ServiceError::invalid_input(format!(
                "wildcard permission '{}' cannot be deleted",
                existing.name
            )));
        }

        let committed = self.ctx.execute_transaction(SERVICE, "delete_permission", |conn| {
            role_permission_repo::remove_links_for_permission_with(
                &self.links,
                conn,
                &existing.name,
            )?;
            self.permissions.remove_with(conn, permission_id)?;
            Ok(true)
        })?;
        if !committed {
            return Err(ServiceError::operation_failed("permission delete was not committed"));
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
            .with_entity(permission_id, "Permission", &existing.name)
            .with_before(existing.to_row()),
        );

        Ok(())
    }

    pub fn get_permission_by_id(
        &self,
        permission_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<Permission>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Permissions.View",
            "You do not have permission to view permissions.",
        )?;
        let permission = self.permissions.find_by_id(permission_id)?;
        Ok(permission.filter(|p| p.status != EntityStatus::Deleted))
    }

    pub fn get_permission_by_name(
        &self,
        name: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<Permission>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Permissions.View",
            "You do not have permission to view permissions.",
        )?;
        let permission = permission_repo::find_by_name(&self.permissions, name)?;
        Ok(permission.filter(|p| p.status != EntityStatus::Deleted))
    }

    pub fn list_permissions(
        &self,
        filter: &Params,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Vec<Permission>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Catalog.Permissions.View",
            "You do not have permission to view permissions.",
        )?;
        permission_repo::list(&self.permissions, filter)
    }
}

fn validate_permission_shape(name: &str, module: &str, action: &str) -> ServiceResult<()> {
    if name.is_empty() || module.is_empty() || action.is_empty() {
        return Err(ServiceError::invalid_input(
            "permission name, module, and action are required",
        ));
    }
    let expected = format!("{module}.{action}");
    if name != expected {
        return Err(ServiceError::invalid_input(format!(
            "permission name '{name}' must be '{expected}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_shape_requires_module_dot_action() {
        assert!(validate_permission_shape("Finance.PostJournalEntry", "Finance", "PostJournalEntry").is_ok());
        assert!(validate_permission_shape("ALL.Manage", "ALL", "Manage").is_ok());

        let err = validate_permission_shape("Finance.Post", "Finance", "PostJournalEntry").unwrap_err();
        assert_eq!(err.kind, platform_contracts::ErrorKind::InvalidInput);
        assert!(validate_permission_shape("", "Finance", "Post").is_err());
    }
}
