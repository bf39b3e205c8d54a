//! # Security
//!
//! The role-based authorization engine: resolves `(user, roles) → permission`
//! decisions against a cached role→permission mapping with wildcard grants,
//! plus the opaque collaborator traits (authentication, encryption, user
//! directory) the composition root wires in from the hosting application.
//!
//! Storage access goes through the [`RolePermissionSource`] seam so this
//! crate stays independent of where role/permission rows live; the catalog
//! module provides the production implementation.

mod authorization;
mod providers;

pub use authorization::{AuthorizationEngine, RolePermissionSource, MANAGE_ALL, READ_ALL};
pub use providers::{
    AuthenticationProvider, EncryptionProvider, PassthroughEncryption, SessionInfo,
    SessionlessAuthentication, StaticUserDirectory, UserDirectory,
};
