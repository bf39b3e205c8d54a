//! Full-stack fixture: bootstrap the facade over a temp database carrying the
//! complete core schema, with a seeded `admin` role holding `ALL.Manage`.

use std::sync::Arc;
use std::time::Duration;

use catalog::records::{Permission, Role, RolePermissionLink};
use catalog::repos::{permission_repo, role_permission_repo, role_repo};
use chrono::Utc;
use erp_core::{bootstrap, FacadeProviders, SecurityFacade};
use persistence::{DbConfig, Params};
use platform_contracts::EntityStatus;
use security::{StaticUserDirectory, MANAGE_ALL};
use tempfile::TempDir;
use uuid::Uuid;

pub const CORE_SCHEMA: &str = "
CREATE TABLE permissions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    module TEXT NOT NULL,
    action TEXT NOT NULL,
    description TEXT,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT,
    updated_by TEXT
);
CREATE TABLE roles (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT,
    updated_by TEXT
);
CREATE TABLE role_permissions (
    id TEXT PRIMARY KEY,
    role_id TEXT NOT NULL,
    permission_name TEXT NOT NULL,
    status INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL
);
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

pub struct Deployment {
    pub facade: Arc<SecurityFacade>,
    pub admin_role_id: String,
    _dir: TempDir,
}

pub fn deployment() -> Deployment {
    deployment_with_pool_size(3)
}

pub fn deployment_with_pool_size(max_connections: usize) -> Deployment {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("erp.db");
    let config = DbConfig::sqlite(path.to_string_lossy().to_string())
        .with_max_connections(max_connections)
        .with_connection_timeout(Duration::from_secs(1));

    let providers = FacadeProviders {
        users: Arc::new(
            StaticUserDirectory::new()
                .with_user("root", "Root Operator")
                .with_user("u1", "Jordan Accountant"),
        ),
        ..FacadeProviders::default()
    };
    let facade = bootstrap(config, providers).expect("bootstrap");

    let guard = facade.pool().acquire().expect("schema connection");
    guard.with(|conn| {
        for statement in CORE_SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, &Params::new()).expect("schema DDL");
        }
    });
    drop(guard);

    let admin_role_id = seed_admin(&facade);
    Deployment {
        facade,
        admin_role_id,
        _dir: dir,
    }
}

fn seed_admin(facade: &Arc<SecurityFacade>) -> String {
    let now = Utc::now();
    let pool = Arc::clone(facade.pool());
    let permissions = permission_repo::repository(Arc::clone(&pool));
    let roles = role_repo::repository(Arc::clone(&pool));
    let links = role_permission_repo::repository(pool);

    permissions
        .create(&Permission {
            id: Uuid::new_v4().to_string(),
            name: MANAGE_ALL.to_string(),
            module: "ALL".into(),
            action: "Manage".into(),
            description: Some("Grants every permission".into()),
            status: EntityStatus::Active,
            created_at: now,
            created_by: "seed".into(),
            updated_at: None,
            updated_by: None,
        })
        .expect("seed wildcard permission");

    let admin = Role {
        id: Uuid::new_v4().to_string(),
        name: "admin".into(),
        description: None,
        status: EntityStatus::Active,
        created_at: now,
        created_by: "seed".into(),
        updated_at: None,
        updated_by: None,
    };
    roles.create(&admin).expect("seed admin role");

    links
        .create(&RolePermissionLink {
            id: Uuid::new_v4().to_string(),
            role_id: admin.id.clone(),
            permission_name: MANAGE_ALL.to_string(),
            status: EntityStatus::Active,
            created_at: now,
            created_by: "seed".into(),
        })
        .expect("seed admin link");

    admin.id
}
