//! Catalog records and their row projections.

use chrono::{DateTime, Utc};
use persistence::row::{get_opt_text, get_opt_timestamp, get_status, get_text, get_timestamp};
use persistence::{Record, Row};
use platform_contracts::{EntityStatus, ServiceResult};

/// A named capability, checked at runtime by the authorization engine.
///
/// `name` is globally unique and follows the `Module.Action` convention; it
/// is the token services pass to `check_permission`.
#[derive(Debug, Clone, PartialEq)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub module: String,
    pub action: String,
    pub description: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Record for Permission {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("name".into(), self.name.clone().into());
        row.insert("module".into(), self.module.clone().into());
        row.insert("action".into(), self.action.clone().into());
        row.insert("description".into(), self.description.clone().into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("updated_at".into(), self.updated_at.into());
        row.insert("updated_by".into(), self.updated_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            name: get_text(row, "name")?,
            module: get_text(row, "module")?,
            action: get_text(row, "action")?,
            description: get_opt_text(row, "description"),
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            updated_at: get_opt_timestamp(row, "updated_at"),
            updated_by: get_opt_text(row, "updated_by"),
        })
    }
}

/// A grouping of permissions assignable to users.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Record for Role {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("name".into(), self.name.clone().into());
        row.insert("description".into(), self.description.clone().into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("updated_at".into(), self.updated_at.into());
        row.insert("updated_by".into(), self.updated_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            name: get_text(row, "name")?,
            description: get_opt_text(row, "description"),
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            updated_at: get_opt_timestamp(row, "updated_at"),
            updated_by: get_opt_text(row, "updated_by"),
        })
    }
}

/// Many-to-many association between a role and a permission, keyed by the
/// permission *name* rather than its id.
#[derive(Debug, Clone, PartialEq)]
pub struct RolePermissionLink {
    pub id: String,
    pub role_id: String,
    pub permission_name: String,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Record for RolePermissionLink {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("role_id".into(), self.role_id.clone().into());
        row.insert(
            "permission_name".into(),
            self.permission_name.clone().into(),
        );
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            role_id: get_text(row, "role_id")?,
            permission_name: get_text(row, "permission_name")?,
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
        })
    }
}
