use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use platform_contracts::ServiceResult;

/// Wildcard granting every permission.
pub const MANAGE_ALL: &str = "ALL.Manage";
/// Wildcard granting every permission whose name ends in `.View`.
pub const READ_ALL: &str = "ALL.Read";

const VIEW_SUFFIX: &str = ".View";

/// Storage-facing seam: loads the permission names granted to one role.
///
/// Implementations must return an empty set for roles that do not exist or
/// are not Active, and must exclude permissions that are not Active.
pub trait RolePermissionSource: Send + Sync {
    fn load_role_permissions(&self, role_id: &str) -> ServiceResult<HashSet<String>>;
}

/// Resolves whether a user's roles grant a named permission.
///
/// The role→permission mapping is cached per role, populated lazily on first
/// consultation and discarded wholesale by [`reload_cache`]. The cache mutex
/// is held across source loads; loads are rare and the mapping is small.
///
/// [`reload_cache`]: AuthorizationEngine::reload_cache
pub struct AuthorizationEngine {
    cache: Mutex<HashMap<String, HashSet<String>>>,
    source: Arc<dyn RolePermissionSource>,
}

impl AuthorizationEngine {
    pub fn new(source: Arc<dyn RolePermissionSource>) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            source,
        }
    }

    /// Decide whether any of `role_ids` grants `permission`.
    ///
    /// Grant paths, checked per role in order: the exact permission name, the
    /// `ALL.Manage` wildcard, and `ALL.Read` for `*.View` permissions.
    /// No roles means deny.
    pub fn has_permission(&self, user_id: &str, role_ids: &[String], permission: &str) -> bool {
        if role_ids.is_empty() {
            tracing::warn!(user_id, permission, "user has no roles assigned; denied");
            return false;
        }

        let mut cache = lock_cache(&self.cache);
        for role_id in role_ids {
            if !cache.contains_key(role_id) {
                let loaded = match self.source.load_role_permissions(role_id) {
                    Ok(permissions) => permissions,
                    Err(e) => {
                        tracing::warn!(role_id = %role_id, error = %e, "failed to load role permissions; treating as empty");
                        HashSet::new()
                    }
                };
                cache.insert(role_id.clone(), loaded);
            }
            let granted = match cache.get(role_id) {
                Some(permissions) => permissions,
                None => continue,
            };

            if granted.contains(permission) {
                tracing::debug!(user_id, role_id = %role_id, permission, "granted by name");
                return true;
            }
            if granted.contains(MANAGE_ALL) {
                tracing::debug!(user_id, role_id = %role_id, permission, "granted by ALL.Manage");
                return true;
            }
            if permission.ends_with(VIEW_SUFFIX) && granted.contains(READ_ALL) {
                tracing::debug!(user_id, role_id = %role_id, permission, "granted by ALL.Read");
                return true;
            }
        }

        tracing::info!(user_id, permission, "permission denied");
        false
    }

    /// Discard every cached role. The next lookup repopulates on demand.
    ///
    /// Called by the service layer after any role, permission, or
    /// role-permission-link mutation commits.
    pub fn reload_cache(&self) {
        lock_cache(&self.cache).clear();
        tracing::info!("permission cache cleared; reloading on demand");
    }

    /// Number of roles currently cached; diagnostic only.
    pub fn cached_roles(&self) -> usize {
        lock_cache(&self.cache).len()
    }
}

fn lock_cache(
    cache: &Mutex<HashMap<String, HashSet<String>>>,
) -> MutexGuard<'_, HashMap<String, HashSet<String>>> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_contracts::ServiceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source backed by a plain map, counting loads to observe caching.
    struct MapSource {
        roles: HashMap<String, HashSet<String>>,
        loads: AtomicUsize,
    }

    impl MapSource {
        fn new(roles: &[(&str, &[&str])]) -> Arc<Self> {
            Arc::new(Self {
                roles: roles
                    .iter()
                    .map(|(role, permissions)| {
                        (
                            role.to_string(),
                            permissions.iter().map(|p| p.to_string()).collect(),
                        )
                    })
                    .collect(),
                loads: AtomicUsize::new(0),
            })
        }
    }

    impl RolePermissionSource for MapSource {
        fn load_role_permissions(&self, role_id: &str) -> ServiceResult<HashSet<String>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.roles.get(role_id).cloned().unwrap_or_default())
        }
    }

    fn roles(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_roles_is_denied() {
        let engine = AuthorizationEngine::new(MapSource::new(&[("admin", &[MANAGE_ALL])]));
        assert!(!engine.has_permission("u1", &[], "Finance.ViewGLAccounts"));
    }

    #[test]
    fn exact_permission_name_grants() {
        let source = MapSource::new(&[("clerk", &["Finance.CreateJournalEntry"])]);
        let engine = AuthorizationEngine::new(source);
        assert!(engine.has_permission("u1", &roles(&["clerk"]), "Finance.CreateJournalEntry"));
        assert!(!engine.has_permission("u1", &roles(&["clerk"]), "Finance.PostJournalEntry"));
    }

    #[test]
    fn manage_all_grants_everything() {
        let engine = AuthorizationEngine::new(MapSource::new(&[("admin", &[MANAGE_ALL])]));
        let admin = roles(&["admin"]);
        assert!(engine.has_permission("u1", &admin, "Finance.CreateGLAccount"));
        assert!(engine.has_permission("u1", &admin, "Catalog.DeleteRole"));
        assert!(engine.has_permission("u1", &admin, "Xyz.Abc"));
    }

    #[test]
    fn read_all_grants_only_view_permissions() {
        let engine = AuthorizationEngine::new(MapSource::new(&[("viewer", &[READ_ALL])]));
        let viewer = roles(&["viewer"]);
        assert!(engine.has_permission("u1", &viewer, "Finance.ViewGLAccounts.View"));
        assert!(engine.has_permission("u1", &viewer, "Catalog.Roles.View"));
        assert!(!engine.has_permission("u1", &viewer, "Finance.CreateGLAccount"));
        assert!(!engine.has_permission("u1", &viewer, "Catalog.DeleteRole"));
    }

    #[test]
    fn any_role_in_the_list_may_grant() {
        let source = MapSource::new(&[
            ("clerk", &["Finance.CreateJournalEntry"]),
            ("auditor", &["Finance.Reports.View"]),
        ]);
        let engine = AuthorizationEngine::new(source);
        assert!(engine.has_permission(
            "u1",
            &roles(&["clerk", "auditor"]),
            "Finance.Reports.View"
        ));
    }

    #[test]
    fn lookups_are_served_from_cache_within_an_epoch() {
        let source = MapSource::new(&[("clerk", &["Finance.CreateJournalEntry"])]);
        let engine = AuthorizationEngine::new(Arc::clone(&source));
        let clerk = roles(&["clerk"]);

        for _ in 0..5 {
            engine.has_permission("u1", &clerk, "Finance.CreateJournalEntry");
        }
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reload_cache_forces_a_fresh_load() {
        let source = MapSource::new(&[("clerk", &["Finance.CreateJournalEntry"])]);
        let engine = AuthorizationEngine::new(Arc::clone(&source));
        let clerk = roles(&["clerk"]);

        engine.has_permission("u1", &clerk, "Finance.CreateJournalEntry");
        engine.reload_cache();
        assert_eq!(engine.cached_roles(), 0);
        engine.has_permission("u1", &clerk, "Finance.CreateJournalEntry");
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn source_failure_denies_without_caching_a_grant() {
        struct FailingSource;
        impl RolePermissionSource for FailingSource {
            fn load_role_permissions(&self, _role_id: &str) -> ServiceResult<HashSet<String>> {
                Err(ServiceError::database("link table unavailable"))
            }
        }
        let engine = AuthorizationEngine::new(Arc::new(FailingSource));
        assert!(!engine.has_permission("u1", &roles(&["clerk"]), "Finance.CreateJournalEntry"));
    }
}
