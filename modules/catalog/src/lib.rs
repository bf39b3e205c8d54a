//! # Catalog
//!
//! Permissions, roles, and the role→permission links that feed the
//! authorization engine. The services here are ordinary feature services —
//! permission check, transaction, audit, event — with one extra duty: every
//! mutation of the authorization graph asks the engine to drop its cache so
//! the next decision sees the committed state.

pub mod records;
pub mod repos;
pub mod services;
pub mod source;

pub use records::{Permission, Role, RolePermissionLink};
pub use services::permission_service::{NewPermission, PermissionService};
pub use services::role_service::{NewRole, RoleService};
pub use source::CatalogRolePermissionSource;
