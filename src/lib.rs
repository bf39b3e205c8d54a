//! # erp-core
//!
//! Composition root of the transactional ERP core. The platform crates
//! (persistence, security, audit, event bus, service scaffold) and the
//! feature modules (catalog, general ledger) are wired together exactly once,
//! here, into a [`SecurityFacade`] — the single object feature code receives
//! to reach any core capability.
//!
//! ```no_run
//! use erp_core::{bootstrap, FacadeProviders};
//! use persistence::DbConfig;
//!
//! # fn main() -> platform_contracts::ServiceResult<()> {
//! let facade = bootstrap(
//!     DbConfig::sqlite("erp.db").with_max_connections(8),
//!     FacadeProviders::default(),
//! )?;
//!
//! let admin_roles = vec!["admin-role-id".to_string()];
//! if facade.has_permission("u1", &admin_roles, "Finance.CreateGLAccount") {
//!     // call facade.general_ledger() ...
//! }
//! facade.shutdown();
//! # Ok(())
//! # }
//! ```

mod facade;

pub use facade::{bootstrap, FacadeProviders, SecurityFacade};

pub use catalog::{NewPermission, NewRole, PermissionService, RoleService};
pub use event_bus::{DomainEvent, EventBus, EventKind};
pub use gl::{
    FinancialReportService, GeneralLedgerService, GlAccountType, NewGlAccount, NewJournalEntry,
    NewJournalEntryDetail, NormalBalance,
};
pub use persistence::{ConnectionPool, DbConfig, EngineKind};
pub use platform_audit::{AuditActionType, AuditEntry, AuditRecorder};
pub use platform_contracts::{EntityStatus, ErrorKind, LogSeverity, ServiceError, ServiceResult};
pub use security::{
    AuthenticationProvider, AuthorizationEngine, EncryptionProvider, UserDirectory,
};
pub use service_core::ServiceContext;
