//! Unified application error types for AuthVault.
//!
//! Every crate maps its internal failures into [`AppError`]. Callers branch
//! on [`AppError::kind`]; the message is for humans and logs only.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the entire workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Unknown user, session, or other addressed row.
    NotFound,
    /// The session has been revoked and can no longer be used.
    SessionRevoked,
    /// The session already holds a current refresh token.
    TokenAlreadyCurrent,
    /// The presented refresh token does not match any stored hash.
    InvalidToken,
    /// The presented refresh token is past its expiry.
    TokenExpired,
    /// A consumed or revoked refresh token was presented again.
    ReplayDetected,
    /// A different key thumbprint is already bound to the session.
    AlreadyBound,
    /// A storage constraint rejected the write (hash collision, lost race).
    ConstraintViolation,
    /// Input validation failed.
    Validation,
    /// A uniqueness conflict on ordinary data (duplicate user name, bookmark).
    Conflict,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::SessionRevoked => write!(f, "SESSION_REVOKED"),
            Self::TokenAlreadyCurrent => write!(f, "TOKEN_ALREADY_CURRENT"),
            Self::InvalidToken => write!(f, "INVALID_TOKEN"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::ReplayDetected => write!(f, "REPLAY_DETECTED"),
            Self::AlreadyBound => write!(f, "ALREADY_BOUND"),
            Self::ConstraintViolation => write!(f, "CONSTRAINT_VIOLATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout AuthVault.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a session-revoked error.
    pub fn session_revoked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionRevoked, message)
    }

    /// Create a token-already-current error.
    pub fn token_already_current(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenAlreadyCurrent, message)
    }

    /// Create an invalid-token error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    /// Create a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a replay-detected error.
    pub fn replay_detected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReplayDetected, message)
    }

    /// Create an already-bound error.
    pub fn already_bound(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyBound, message)
    }

    /// Create a constraint-violation error.
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConstraintViolation, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
