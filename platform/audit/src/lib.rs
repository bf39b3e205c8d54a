//! # Audit
//!
//! Append-only structured audit trail. Every committed mutation in the system
//! produces exactly one [`AuditRecord`] with actor identity, entity reference,
//! optional before/after snapshots, and compliance flags. Records are
//! immutable once written.
//!
//! The [`AuditRecorder`] is invoked *after* the primary work has committed,
//! which is why it never signals failure upstream: a trail that cannot be
//! written is itself logged and swallowed rather than failing an operation
//! that already happened.

mod record;
mod recorder;

pub use record::{AuditActionType, AuditEntry, AuditRecord, AUDIT_LOG_TABLE};
pub use recorder::AuditRecorder;
