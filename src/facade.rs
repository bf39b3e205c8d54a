use std::sync::Arc;

use catalog::{CatalogRolePermissionSource, PermissionService, RoleService};
use event_bus::EventBus;
use gl::{FinancialReportService, GeneralLedgerService};
use persistence::{ConnectionPool, DbConfig};
use platform_audit::AuditRecorder;
use platform_contracts::ServiceResult;
use security::{
    AuthenticationProvider, AuthorizationEngine, EncryptionProvider, PassthroughEncryption,
    SessionlessAuthentication, StaticUserDirectory, UserDirectory,
};
use service_core::ServiceContext;

/// Host-supplied collaborators. The defaults are inert: no sessions
/// validate, encryption is the identity transform, and no user names
/// resolve.
pub struct FacadeProviders {
    pub authentication: Arc<dyn AuthenticationProvider>,
    pub encryption: Arc<dyn EncryptionProvider>,
    pub users: Arc<dyn UserDirectory>,
}

impl Default for FacadeProviders {
    fn default() -> Self {
        Self {
            authentication: Arc::new(SessionlessAuthentication),
            encryption: Arc::new(PassthroughEncryption),
            users: Arc::new(StaticUserDirectory::new()),
        }
    }
}

/// Single entry point to the core.
///
/// Owns (by `Arc`) every shared capability and every feature service, so
/// construction order — and with it the resolution of cross-service
/// dependencies — is encoded in exactly one place: [`bootstrap`].
pub struct SecurityFacade {
    pool: Arc<ConnectionPool>,
    events: Arc<EventBus>,
    audit: Arc<AuditRecorder>,
    authorization: Arc<AuthorizationEngine>,
    authentication: Arc<dyn AuthenticationProvider>,
    encryption: Arc<dyn EncryptionProvider>,
    users: Arc<dyn UserDirectory>,
    context: Arc<ServiceContext>,
    permission_service: PermissionService,
    role_service: RoleService,
    ledger_service: GeneralLedgerService,
    report_service: FinancialReportService,
}

impl SecurityFacade {
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn audit(&self) -> &Arc<AuditRecorder> {
        &self.audit
    }

    pub fn authorization(&self) -> &Arc<AuthorizationEngine> {
        &self.authorization
    }

    pub fn authentication(&self) -> &Arc<dyn AuthenticationProvider> {
        &self.authentication
    }

    pub fn encryption(&self) -> &Arc<dyn EncryptionProvider> {
        &self.encryption
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    pub fn context(&self) -> &Arc<ServiceContext> {
        &self.context
    }

    pub fn permission_service(&self) -> &PermissionService {
        &self.permission_service
    }

    pub fn role_service(&self) -> &RoleService {
        &self.role_service
    }

    pub fn general_ledger(&self) -> &GeneralLedgerService {
        &self.ledger_service
    }

    pub fn financial_reports(&self) -> &FinancialReportService {
        &self.report_service
    }

    /// Convenience mirror of the authorization engine's decision.
    pub fn has_permission(&self, user_id: &str, role_ids: &[String], permission: &str) -> bool {
        self.authorization.has_permission(user_id, role_ids, permission)
    }

    /// Drain the connection pool. New work is rejected; in-flight operations
    /// observe errors when they next touch the database.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

/// Construct the core.
///
/// Order matters and is the point of this function: pool first (everything
/// persists through it), then bus and audit, then the catalog-backed
/// role-permission source feeding the authorization engine, then the shared
/// service context, then every feature service over that context.
pub fn bootstrap(
    config: DbConfig,
    providers: FacadeProviders,
) -> ServiceResult<Arc<SecurityFacade>> {
    let pool = Arc::new(ConnectionPool::new());
    pool.initialize(&config)?;

    let events = Arc::new(EventBus::new());
    let audit = Arc::new(AuditRecorder::new(Arc::clone(&pool)));

    let source = Arc::new(CatalogRolePermissionSource::new(Arc::clone(&pool)));
    let authorization = Arc::new(AuthorizationEngine::new(source));

    let context = Arc::new(ServiceContext::new(
        Arc::clone(&authorization),
        Arc::clone(&audit),
        Arc::clone(&pool),
        Arc::clone(&events),
        Arc::clone(&providers.users),
    ));

    let permission_service = PermissionService::new(Arc::clone(&context), Arc::clone(&pool));
    let role_service = RoleService::new(Arc::clone(&context), Arc::clone(&pool));
    let ledger_service = GeneralLedgerService::new(Arc::clone(&context), Arc::clone(&pool));
    let report_service = FinancialReportService::new(Arc::clone(&context), Arc::clone(&pool));

    tracing::info!("ERP core bootstrapped");
    Ok(Arc::new(SecurityFacade {
        pool,
        events,
        audit,
        authorization,
        authentication: providers.authentication,
        encryption: providers.encryption,
        users: providers.users,
        context,
        permission_service,
        role_service,
        ledger_service,
        report_service,
    }))
}
