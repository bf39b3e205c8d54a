use serde::{Deserialize, Serialize};

/// Lifecycle status shared by every persisted entity.
///
/// Stored as an integer column; `Deleted` is the soft-delete marker, meaning
/// the row is logically absent to reads that do not opt in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityStatus {
    Active,
    Inactive,
    Pending,
    Deleted,
    Unknown,
}

impl EntityStatus {
    pub fn code(self) -> i64 {
        match self {
            EntityStatus::Inactive => 0,
            EntityStatus::Active => 1,
            EntityStatus::Pending => 2,
            EntityStatus::Deleted => 3,
            EntityStatus::Unknown => 99,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => EntityStatus::Inactive,
            1 => EntityStatus::Active,
            2 => EntityStatus::Pending,
            3 => EntityStatus::Deleted,
            _ => EntityStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityStatus::Active => "Active",
            EntityStatus::Inactive => "Inactive",
            EntityStatus::Pending => "Pending",
            EntityStatus::Deleted => "Deleted",
            EntityStatus::Unknown => "Unknown",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "Active" => EntityStatus::Active,
            "Inactive" => EntityStatus::Inactive,
            "Pending" => EntityStatus::Pending,
            "Deleted" => EntityStatus::Deleted,
            _ => EntityStatus::Unknown,
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to audit records and structured log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogSeverity {
    pub fn code(self) -> i64 {
        match self {
            LogSeverity::Debug => 0,
            LogSeverity::Info => 1,
            LogSeverity::Warning => 2,
            LogSeverity::Error => 3,
            LogSeverity::Critical => 4,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => LogSeverity::Debug,
            2 => LogSeverity::Warning,
            3 => LogSeverity::Error,
            4 => LogSeverity::Critical,
            _ => LogSeverity::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Warning => "WARNING",
            LogSeverity::Error => "ERROR",
            LogSeverity::Critical => "CRITICAL",
        }
    }
}
