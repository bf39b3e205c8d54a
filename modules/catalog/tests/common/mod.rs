//! Shared fixture: a full platform stack over a temp-file database, with an
//! `admin` role carrying the manage-everything wildcard seeded directly
//! through the repositories.

use std::sync::Arc;
use std::time::Duration;

use catalog::records::{Permission, Role, RolePermissionLink};
use catalog::repos::{permission_repo, role_permission_repo, role_repo};
use catalog::CatalogRolePermissionSource;
use chrono::Utc;
use event_bus::EventBus;
use persistence::{ConnectionPool, DbConfig, Params, Record};
use platform_audit::AuditRecorder;
use platform_contracts::EntityStatus;
use security::{AuthorizationEngine, StaticUserDirectory, MANAGE_ALL};
use service_core::ServiceContext;
use tempfile::TempDir;
use uuid::Uuid;

pub const CATALOG_SCHEMA: &str = "
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

pub struct Stack {
    pub pool: Arc<ConnectionPool>,
    pub ctx: Arc<ServiceContext>,
    pub engine: Arc<AuthorizationEngine>,
    pub events: Arc<EventBus>,
    pub audit: Arc<AuditRecorder>,
    pub admin_role_id: String,
    _dir: TempDir,
}

pub fn stack() -> Stack {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("catalog.db");
    let config = DbConfig::sqlite(path.to_string_lossy().to_string())
        .with_max_connections(3)
        .with_connection_timeout(Duration::from_secs(1));
    let pool = Arc::new(ConnectionPool::new());
    pool.initialize(&config).expect("pool init");

    let guard = pool.acquire().expect("schema connection");
    guard.with(|conn| {
        for statement in CATALOG_SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, &Params::new()).expect("schema DDL");
        }
    });
    drop(guard);

    let admin_role_id = seed_admin(&pool);

    let source = Arc::new(CatalogRolePermissionSource::new(Arc::clone(&pool)));
    let engine = Arc::new(AuthorizationEngine::new(source));
    let events = Arc::new(EventBus::new());
    let audit = Arc::new(AuditRecorder::new(Arc::clone(&pool)));
    let users = Arc::new(StaticUserDirectory::new().with_user("root", "Root Operator"));

    let ctx = Arc::new(ServiceContext::new(
        Arc::clone(&engine),
        Arc::clone(&audit),
        Arc::clone(&pool),
        Arc::clone(&events),
        users,
    ));

    Stack {
        pool,
        ctx,
        engine,
        events,
        audit,
        admin_role_id,
        _dir: dir,
    }
}

/// Seed the bootstrap `admin` role holding `ALL.Manage`, writing through the
/// repositories directly because no service can run before a grant exists.
fn seed_admin(pool: &Arc<ConnectionPool>) -> String {
    let now = Utc::now();
    let permissions = permission_repo::repository(Arc::clone(pool));
    let roles = role_repo::repository(Arc::clone(pool));
    let links = role_permission_repo::repository(Arc::clone(pool));

    let manage_all = Permission {
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
    };
    permissions.create(&manage_all).expect("seed permission");

    let admin = Role {
        id: Uuid::new_v4().to_string(),
        name: "admin".into(),
        description: Some("Bootstrap administrators".into()),
        status: EntityStatus::Active,
        created_at: now,
        created_by: "seed".into(),
        updated_at: None,
        updated_by: None,
    };
    roles.create(&admin).expect("seed role");

    let link = RolePermissionLink {
        id: Uuid::new_v4().to_string(),
        role_id: admin.id.clone(),
        permission_name: MANAGE_ALL.to_string(),
        status: EntityStatus::Active,
        created_at: now,
        created_by: "seed".into(),
    };
    links.create(&link).expect("seed link");

    admin.id().to_string()
}
