//! Opaque collaborator seams.
//!
//! Authentication, encryption, and user-name lookup belong to the hosting
//! application; the core only consumes them through these traits. The
//! inert implementations below are for hosts and tests that bring none.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use platform_contracts::ServiceResult;

/// Minimal view of an authenticated session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Session existence/validity, owned by the host's authentication stack.
pub trait AuthenticationProvider: Send + Sync {
    fn validate_session(&self, session_id: &str) -> Option<SessionInfo>;
}

/// Field-level encryption, owned by the host.
pub trait EncryptionProvider: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> ServiceResult<String>;
    fn decrypt(&self, ciphertext: &str) -> ServiceResult<String>;
}

/// Resolves user ids to display names for audit records.
pub trait UserDirectory: Send + Sync {
    fn user_name(&self, user_id: &str) -> Option<String>;
}

/// Rejects every session; for hosts that do their own session handling
/// upstream of the core.
pub struct SessionlessAuthentication;

impl AuthenticationProvider for SessionlessAuthentication {
    fn validate_session(&self, _session_id: &str) -> Option<SessionInfo> {
        None
    }
}

/// Identity transform; stands in where the host supplies no cipher.
pub struct PassthroughEncryption;

impl EncryptionProvider for PassthroughEncryption {
    fn encrypt(&self, plaintext: &str) -> ServiceResult<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> ServiceResult<String> {
        Ok(ciphertext.to_string())
    }
}

/// Fixed user-id→name table.
#[derive(Default)]
pub struct StaticUserDirectory {
    names: HashMap<String, String>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(user_id.into(), name.into());
        self
    }
}

impl UserDirectory for StaticUserDirectory {
    fn user_name(&self, user_id: &str) -> Option<String> {
        self.names.get(user_id).cloned()
    }
}
