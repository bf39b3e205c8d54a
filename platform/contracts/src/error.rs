use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed enumeration of error kinds surfaced at service boundaries.
///
/// The numeric codes are stable and are what integrations log and match on;
/// new kinds may be appended but existing codes never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Ok,
    NotFound,
    InvalidInput,
    Unauthorized,
    AuthenticationFailed,
    Forbidden,
    SessionExpired,
    DatabaseError,
    ServerError,
    OperationFailed,
    InsufficientStock,
    EncryptionError,
    DecryptionError,
}

impl ErrorKind {
    /// Stable numeric code for logs and external consumers.
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::Ok => 0,
            ErrorKind::NotFound => 100,
            ErrorKind::InvalidInput => 200,
            ErrorKind::Unauthorized => 300,
            ErrorKind::AuthenticationFailed => 301,
            ErrorKind::Forbidden => 400,
            ErrorKind::SessionExpired => 401,
            ErrorKind::DatabaseError => 500,
            ErrorKind::ServerError => 501,
            ErrorKind::OperationFailed => 600,
            ErrorKind::InsufficientStock => 700,
            ErrorKind::EncryptionError => 800,
            ErrorKind::DecryptionError => 801,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Ok => "OK",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::SessionExpired => "SessionExpired",
            ErrorKind::DatabaseError => "DatabaseError",
            ErrorKind::ServerError => "ServerError",
            ErrorKind::OperationFailed => "OperationFailed",
            ErrorKind::InsufficientStock => "InsufficientStock",
            ErrorKind::EncryptionError => "EncryptionError",
            ErrorKind::DecryptionError => "DecryptionError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carried across service boundaries.
///
/// `message` is the developer-facing text that goes to the log; `user_message`
/// is the optional presentation text a UI layer may show verbatim.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
    pub user_message: Option<String>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            user_message: None,
        }
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = Some(user_message.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationFailed, message)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
