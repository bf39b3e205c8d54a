use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tags for every event the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PermissionCreated,
    PermissionUpdated,
    PermissionStatusChanged,
    RoleCreated,
    RoleUpdated,
    RoleStatusChanged,
    JournalEntryCreated,
    JournalEntryPosted,
}

impl EventKind {
    /// Dotted subject string used in logs and by external consumers.
    pub fn subject(self) -> &'static str {
        match self {
            EventKind::PermissionCreated => "catalog.permission.created",
            EventKind::PermissionUpdated => "catalog.permission.updated",
            EventKind::PermissionStatusChanged => "catalog.permission.status_changed",
            EventKind::RoleCreated => "catalog.role.created",
            EventKind::RoleUpdated => "catalog.role.updated",
            EventKind::RoleStatusChanged => "catalog.role.status_changed",
            EventKind::JournalEntryCreated => "finance.journal_entry.created",
            EventKind::JournalEntryPosted => "finance.journal_entry.posted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.subject())
    }
}

/// A domain event envelope.
///
/// The payload always carries the affected entity identifier(s) and a summary
/// of the new state; it never carries enough to replay the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subjects_are_namespaced_by_module() {
        assert_eq!(
            EventKind::JournalEntryPosted.subject(),
            "finance.journal_entry.posted"
        );
        assert_eq!(EventKind::RoleCreated.subject(), "catalog.role.created");
    }

    #[test]
    fn envelope_serializes_with_payload() {
        let event = DomainEvent::new(
            EventKind::JournalEntryCreated,
            json!({"journal_entry_id": "je-1", "journal_number": "JE-2025-001"}),
        );
        let text = serde_json::to_string(&event).unwrap();
        let back: DomainEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back.event_id, event.event_id);
        assert_eq!(back.kind, EventKind::JournalEntryCreated);
        assert_eq!(back.payload["journal_number"], "JE-2025-001");
    }
}
