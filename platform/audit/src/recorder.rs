use std::sync::Arc;

use chrono::Utc;
use persistence::{ConnectionPool, Record, Repository};
use platform_contracts::EntityStatus;
use uuid::Uuid;

use crate::record::{AuditEntry, AuditRecord, AUDIT_LOG_TABLE};

/// Writes audit records through the generic repository, one transaction per
/// record.
///
/// Recording never fails upstream: callers invoke it after their primary work
/// has already committed, so a failed write is logged at error level and
/// dropped.
pub struct AuditRecorder {
    pool: Arc<ConnectionPool>,
    repo: Repository<AuditRecord>,
}

impl AuditRecorder {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        let repo = Repository::new(Arc::clone(&pool), AUDIT_LOG_TABLE);
        Self { pool, repo }
    }

    /// Persist one audit event.
    pub fn record(&self, entry: AuditEntry) {
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            status: EntityStatus::Active,
            created_at: Utc::now(),
            created_by: entry.user_id.clone(),
            user_id: entry.user_id,
            user_name: entry.user_name,
            session_id: entry.session_id,
            action_type: entry.action_type,
            severity: entry.severity,
            module: entry.module,
            sub_module: entry.sub_module,
            entity_id: entry.entity_id,
            entity_type: entry.entity_type,
            entity_name: entry.entity_name,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            workstation_id: entry.workstation_id,
            before_data: entry.before_data,
            after_data: entry.after_data,
            change_reason: entry.change_reason,
            metadata: entry.metadata,
            is_compliant: entry.is_compliant,
            compliance_note: entry.compliance_note,
        };

        if let Err(e) = self.write(&record) {
            tracing::error!(
                audit_id = %record.id,
                module = %record.module,
                sub_module = %record.sub_module,
                error = %e,
                "failed to write audit record; event dropped"
            );
        }
    }

    fn write(&self, record: &AuditRecord) -> platform_contracts::ServiceResult<()> {
        let guard = self.pool.acquire()?;
        guard.with(|conn| {
            conn.begin_transaction()?;
            match self.repo.create_with(conn, record) {
                Ok(()) => conn.commit_transaction(),
                Err(e) => {
                    if let Err(rollback) = conn.rollback_transaction() {
                        tracing::warn!(error = %rollback, "rollback after audit failure failed");
                    }
                    Err(e)
                }
            }
        })
    }

    /// Read back audit records for an entity; used by compliance tooling and
    /// tests.
    pub fn records_for_entity(
        &self,
        entity_id: &str,
    ) -> platform_contracts::ServiceResult<Vec<AuditRecord>> {
        let mut filter = persistence::Params::new();
        filter.insert("entity_id".into(), entity_id.into());
        self.repo.find(&filter)
    }

    pub fn count(&self) -> platform_contracts::ServiceResult<i64> {
        self.repo.count(&persistence::Params::new())
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("table", &self.repo.table())
            .finish()
    }
}
