//! Shared fixture: the platform stack over a temp-file database with a stub
//! role-permission source (role `finance` holds the manage-everything
//! wildcard).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use event_bus::EventBus;
use persistence::{ConnectionPool, DbConfig, Params};
use platform_audit::AuditRecorder;
use platform_contracts::ServiceResult;
use security::{AuthorizationEngine, RolePermissionSource, StaticUserDirectory, MANAGE_ALL};
use service_core::ServiceContext;
use tempfile::TempDir;

pub const GL_SCHEMA: &str = "
CREATE TABLE gl_accounts (
    id TEXT PRIMARY KEY,
    account_number TEXT NOT NULL UNIQUE,
    account_name TEXT NOT NULL,
    account_type INTEGER NOT NULL,
    normal_balance INTEGER NOT NULL,
    parent_account_id TEXT,
    description TEXT,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT,
    updated_by TEXT
);
CREATE TABLE gl_account_balances (
    id TEXT PRIMARY KEY,
    gl_account_id TEXT NOT NULL,
    current_debit_balance REAL NOT NULL,
    current_credit_balance REAL NOT NULL,
    currency TEXT NOT NULL,
    last_posted_date TEXT NOT NULL,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT,
    updated_by TEXT
);
CREATE TABLE journal_entries (
    id TEXT PRIMARY KEY,
    journal_number TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    entry_date TEXT NOT NULL,
    posting_date TEXT,
    reference TEXT,
    total_debit REAL NOT NULL,
    total_credit REAL NOT NULL,
    posted_by_user_id TEXT,
    is_posted INTEGER NOT NULL,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT,
    updated_by TEXT
);
CREATE TABLE journal_entry_details (
    id TEXT PRIMARY KEY,
    journal_entry_id TEXT NOT NULL,
    gl_account_id TEXT NOT NULL,
    debit_amount REAL NOT NULL,
    credit_amount REAL NOT NULL,
    notes TEXT,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT,
    updated_by TEXT
);
CREATE TABLE audit_logs (
    id TEXT PRIMARY KEY,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    user_id TEXT NOT NULL,
    user_name TEXT NOT NULL,
    session_id TEXT,
    action_type INTEGER NOT NULL,
    severity INTEGER NOT NULL,
    module TEXT NOT NULL,
    sub_module TEXT NOT NULL,
    entity_id TEXT,
    entity_type TEXT,
    entity_name TEXT,
    ip_address TEXT,
    user_agent TEXT,
    workstation_id TEXT,
    before_data TEXT,
    after_data TEXT,
    change_reason TEXT,
    metadata TEXT NOT NULL,
    is_compliant INTEGER NOT NULL,
    compliance_note TEXT
);
";

struct WildcardSource;

impl RolePermissionSource for WildcardSource {
    fn load_role_permissions(&self, role_id: &str) -> ServiceResult<HashSet<String>> {
        if role_id == "finance" {
            Ok([MANAGE_ALL.to_string()].into_iter().collect())
        } else {
            Ok(HashSet::new())
        }
    }
}

pub struct Stack {
    pub pool: Arc<ConnectionPool>,
    pub ctx: Arc<ServiceContext>,
    pub events: Arc<EventBus>,
    pub audit: Arc<AuditRecorder>,
    _dir: TempDir,
}

pub fn stack() -> Stack {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ledger.db");
    let config = DbConfig::sqlite(path.to_string_lossy().to_string())
        .with_max_connections(3)
        .with_connection_timeout(Duration::from_secs(1));
    let pool = Arc::new(ConnectionPool::new());
    pool.initialize(&config).expect("pool init");

    let guard = pool.acquire().expect("schema connection");
    guard.with(|conn| {
        for statement in GL_SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, &Params::new()).expect("schema DDL");
        }
    });
    drop(guard);

    let engine = Arc::new(AuthorizationEngine::new(Arc::new(WildcardSource)));
    let events = Arc::new(EventBus::new());
    let audit = Arc::new(AuditRecorder::new(Arc::clone(&pool)));
    let users = Arc::new(StaticUserDirectory::new().with_user("u1", "Jordan Accountant"));

    let ctx = Arc::new(ServiceContext::new(
        engine,
        Arc::clone(&audit),
        Arc::clone(&pool),
        Arc::clone(&events),
        users,
    ));

    Stack {
        pool,
        ctx,
        events,
        audit,
        _dir: dir,
    }
}

pub fn finance_roles() -> Vec<String> {
    vec!["finance".to_string()]
}
