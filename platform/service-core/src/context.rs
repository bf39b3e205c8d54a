use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use audit::{AuditEntry, AuditRecorder};
use event_bus::{DomainEvent, EventBus};
use persistence::{ConnectionPool, DbConnection};
use platform_contracts::{ServiceError, ServiceResult};
use security::{AuthorizationEngine, UserDirectory};

/// Shared dependencies of every feature service.
///
/// Constructed once in the composition root and handed to services by `Arc`.
pub struct ServiceContext {
    authorization: Arc<AuthorizationEngine>,
    audit: Arc<AuditRecorder>,
    pool: Arc<ConnectionPool>,
    events: Arc<EventBus>,
    users: Arc<dyn UserDirectory>,
}

impl ServiceContext {
    pub fn new(
        authorization: Arc<AuthorizationEngine>,
        audit: Arc<AuditRecorder>,
        pool: Arc<ConnectionPool>,
        events: Arc<EventBus>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            authorization,
            audit,
            pool,
            events,
            users,
        }
    }

    pub fn authorization(&self) -> &Arc<AuthorizationEngine> {
        &self.authorization
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Deny with *Forbidden* unless one of the user's roles grants
    /// `permission`. `user_message` is surfaced to the caller's UI verbatim.
    pub fn check_permission(
        &self,
        user_id: &str,
        role_ids: &[String],
        permission: &str,
        user_message: &str,
    ) -> ServiceResult<()> {
        if self.authorization.has_permission(user_id, role_ids, permission) {
            return Ok(());
        }
        tracing::warn!(user_id, permission, "permission denied");
        Err(ServiceError::forbidden(format!("permission denied: {permission}"))
            .with_user_message(user_message))
    }

    /// Run `work` inside one transaction on one pooled connection.
    ///
    /// Commits when `work` returns `Ok(true)`; rolls back on `Ok(false)` and
    /// on error. A panic inside `work` is caught, rolled back, and reported
    /// as *OperationFailed* — the connection returns to the pool on every
    /// path. The callback is the only place per-operation SQL may run, and
    /// every repository call inside it must use the supplied connection.
    pub fn execute_transaction<F>(
        &self,
        service: &str,
        operation: &str,
        work: F,
    ) -> ServiceResult<bool>
    where
        F: FnOnce(&mut dyn DbConnection) -> ServiceResult<bool>,
    {
        let guard = self.pool.acquire().map_err(|e| {
            tracing::error!(service, operation, error = %e, "could not acquire connection");
            e
        })?;

        guard.with(|conn| {
            conn.begin_transaction()?;

            let outcome = catch_unwind(AssertUnwindSafe(|| work(&mut *conn)));

            match outcome {
                Ok(Ok(true)) => {
                    conn.commit_transaction()?;
                    tracing::debug!(service, operation, "transaction committed");
                    Ok(true)
                }
                Ok(Ok(false)) => {
                    rollback_quietly(conn, service, operation);
                    tracing::debug!(service, operation, "transaction rolled back by work");
                    Ok(false)
                }
                Ok(Err(e)) => {
                    rollback_quietly(conn, service, operation);
                    tracing::error!(service, operation, error = %e, "transaction rolled back");
                    Err(e)
                }
                Err(panic) => {
                    rollback_quietly(conn, service, operation);
                    let detail = panic_message(panic.as_ref());
                    tracing::error!(service, operation, detail, "work callback panicked");
                    Err(ServiceError::operation_failed(format!(
                        "{service}.{operation} aborted: {detail}"
                    )))
                }
            }
        })
    }

    /// Record an audit event for a committed operation. Never fails the
    /// caller; call only after `execute_transaction` returned `Ok(true)` so
    /// that rolled-back work leaves no trace.
    pub fn record_audit(&self, entry: AuditEntry) {
        self.audit.record(entry);
    }

    /// Publish a domain event. Call after successful commit, in the same
    /// call frame, so subscribers never observe rolled-back work.
    pub fn publish(&self, event: DomainEvent) {
        self.events.publish(&event);
    }

    /// Display name for audit records; falls back to the raw user id.
    pub fn user_name(&self, user_id: &str) -> String {
        self.users
            .user_name(user_id)
            .unwrap_or_else(|| user_id.to_string())
    }
}

fn rollback_quietly(conn: &mut dyn DbConnection, service: &str, operation: &str) {
    if conn.in_transaction() {
        if let Err(e) = conn.rollback_transaction() {
            tracing::error!(service, operation, error = %e, "rollback failed");
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
