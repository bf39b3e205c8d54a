use chrono::{DateTime, Utc};
use persistence::row::{get_opt_text, get_status, get_text, get_timestamp};
use persistence::{Record, Row};
use platform_contracts::{
    value_map_from_json, value_map_to_json, EntityStatus, LogSeverity, ServiceResult, Value,
    ValueMap,
};
use serde::{Deserialize, Serialize};

pub const AUDIT_LOG_TABLE: &str = "audit_logs";

/// Kind of action an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditActionType {
    Create,
    Update,
    Delete,
    StatusChange,
    Post,
    Login,
    Logout,
    Access,
}

impl AuditActionType {
    pub fn code(self) -> i64 {
        match self {
            AuditActionType::Create => 1,
            AuditActionType::Update => 2,
            AuditActionType::Delete => 3,
            AuditActionType::StatusChange => 4,
            AuditActionType::Post => 5,
            AuditActionType::Login => 6,
            AuditActionType::Logout => 7,
            AuditActionType::Access => 8,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => AuditActionType::Create,
            2 => AuditActionType::Update,
            3 => AuditActionType::Delete,
            4 => AuditActionType::StatusChange,
            5 => AuditActionType::Post,
            6 => AuditActionType::Login,
            7 => AuditActionType::Logout,
            _ => AuditActionType::Access,
        }
    }
}

/// Caller-supplied fields of one audit event. The recorder stamps identity
/// and creation metadata when persisting.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: String,
    pub user_name: String,
    pub session_id: Option<String>,
    pub action_type: AuditActionType,
    pub severity: LogSeverity,
    pub module: String,
    pub sub_module: String,
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub entity_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub workstation_id: Option<String>,
    pub before_data: Option<ValueMap>,
    pub after_data: Option<ValueMap>,
    pub change_reason: Option<String>,
    pub metadata: ValueMap,
    pub is_compliant: bool,
    pub compliance_note: Option<String>,
}

impl AuditEntry {
    /// Entry with the mandatory actor/action fields; everything else defaults
    /// to absent/compliant.
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        action_type: AuditActionType,
        severity: LogSeverity,
        module: impl Into<String>,
        sub_module: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            session_id: None,
            action_type,
            severity,
            module: module.into(),
            sub_module: sub_module.into(),
            entity_id: None,
            entity_type: None,
            entity_name: None,
            ip_address: None,
            user_agent: None,
            workstation_id: None,
            before_data: None,
            after_data: None,
            change_reason: None,
            metadata: ValueMap::new(),
            is_compliant: true,
            compliance_note: None,
        }
    }

    pub fn with_entity(
        mut self,
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_name: impl Into<String>,
    ) -> Self {
        self.entity_id = Some(entity_id.into());
        self.entity_type = Some(entity_type.into());
        self.entity_name = Some(entity_name.into());
        self
    }

    pub fn with_before(mut self, before: ValueMap) -> Self {
        self.before_data = Some(before);
        self
    }

    pub fn with_after(mut self, after: ValueMap) -> Self {
        self.after_data = Some(after);
        self
    }

    pub fn with_change_reason(mut self, reason: impl Into<String>) -> Self {
        self.change_reason = Some(reason.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// One persisted, immutable audit event.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: String,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub user_id: String,
    pub user_name: String,
    pub session_id: Option<String>,
    pub action_type: AuditActionType,
    pub severity: LogSeverity,
    pub module: String,
    pub sub_module: String,
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub entity_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub workstation_id: Option<String>,
    pub before_data: Option<ValueMap>,
    pub after_data: Option<ValueMap>,
    pub change_reason: Option<String>,
    pub metadata: ValueMap,
    pub is_compliant: bool,
    pub compliance_note: Option<String>,
}

fn snapshot_to_text(snapshot: &Option<ValueMap>) -> Value {
    match snapshot {
        Some(map) => Value::Text(value_map_to_json(map).to_string()),
        None => Value::Null,
    }
}

fn snapshot_from_text(row: &Row, column: &str) -> Option<ValueMap> {
    let text = get_opt_text(row, column)?;
    let json: serde_json::Value = serde_json::from_str(&text).ok()?;
    Some(value_map_from_json(&json))
}

impl Record for AuditRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("user_id".into(), self.user_id.clone().into());
        row.insert("user_name".into(), self.user_name.clone().into());
        row.insert("session_id".into(), self.session_id.clone().into());
        row.insert("action_type".into(), self.action_type.code().into());
        row.insert("severity".into(), self.severity.code().into());
        row.insert("module".into(), self.module.clone().into());
        row.insert("sub_module".into(), self.sub_module.clone().into());
        row.insert("entity_id".into(), self.entity_id.clone().into());
        row.insert("entity_type".into(), self.entity_type.clone().into());
        row.insert("entity_name".into(), self.entity_name.clone().into());
        row.insert("ip_address".into(), self.ip_address.clone().into());
        row.insert("user_agent".into(), self.user_agent.clone().into());
        row.insert("workstation_id".into(), self.workstation_id.clone().into());
        row.insert("before_data".into(), snapshot_to_text(&self.before_data));
        row.insert("after_data".into(), snapshot_to_text(&self.after_data));
        row.insert("change_reason".into(), self.change_reason.clone().into());
        row.insert(
            "metadata".into(),
            Value::Text(value_map_to_json(&self.metadata).to_string()),
        );
        row.insert("is_compliant".into(), self.is_compliant.into());
        row.insert(
            "compliance_note".into(),
            self.compliance_note.clone().into(),
        );
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        let metadata = snapshot_from_text(row, "metadata").unwrap_or_default();
        Ok(Self {
            id: get_text(row, "id")?,
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            user_id: get_text(row, "user_id")?,
            user_name: get_text(row, "user_name")?,
            session_id: get_opt_text(row, "session_id"),
            action_type: AuditActionType::from_code(
                persistence::row::get_i64(row, "action_type")?,
            ),
            severity: LogSeverity::from_code(persistence::row::get_i64(row, "severity")?),
            module: get_text(row, "module")?,
            sub_module: get_text(row, "sub_module")?,
            entity_id: get_opt_text(row, "entity_id"),
            entity_type: get_opt_text(row, "entity_type"),
            entity_name: get_opt_text(row, "entity_name"),
            ip_address: get_opt_text(row, "ip_address"),
            user_agent: get_opt_text(row, "user_agent"),
            workstation_id: get_opt_text(row, "workstation_id"),
            before_data: snapshot_from_text(row, "before_data"),
            after_data: snapshot_from_text(row, "after_data"),
            change_reason: get_opt_text(row, "change_reason"),
            metadata,
            is_compliant: persistence::row::get_bool(row, "is_compliant")?,
            compliance_note: get_opt_text(row, "compliance_note"),
        })
    }
}
