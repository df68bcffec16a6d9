//! Unified application error types for LicenseHub.
//!
//! Every core operation returns [`AppError`] on failure. The [`ErrorKind`]
//! is the taxonomy the outer request layer maps onto transport responses.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A license, form, code, credential or identity is absent.
    NotFound,
    /// A license, form, credential or code is past its deadline.
    Expired,
    /// The activation ceiling of a license has been reached.
    LimitReached,
    /// A single-use activation code was already consumed.
    AlreadyUsed,
    /// An activation request form was already completed.
    AlreadyCompleted,
    /// A license key is malformed.
    InvalidFormat,
    /// The target is not in a state that admits the operation.
    InvalidState,
    /// A scope or ownership check failed.
    PermissionDenied,
    /// Authentication failed. The message is always opaque.
    Authentication,
    /// Caller input was rejected before touching the store.
    Validation,
    /// A uniqueness constraint was violated.
    Conflict,
    /// The persistence collaborator failed. The only retryable kind.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal invariant was broken.
    Internal,
}

impl ErrorKind {
    /// Whether the caller may retry the same input unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::LimitReached => write!(f, "LIMIT_REACHED"),
            Self::AlreadyUsed => write!(f, "ALREADY_USED"),
            Self::AlreadyCompleted => write!(f, "ALREADY_COMPLETED"),
            Self::InvalidFormat => write!(f, "INVALID_FORMAT"),
            Self::InvalidState => write!(f, "INVALID_STATE"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout LicenseHub.
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

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an expired error.
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    /// Create a limit-reached error.
    pub fn limit_reached(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LimitReached, message)
    }

    /// Create an already-used error.
    pub fn already_used(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyUsed, message)
    }

    /// Create an already-completed error.
    pub fn already_completed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyCompleted, message)
    }

    /// Create an invalid-format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFormat, message)
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// The opaque authentication failure reported at the boundary.
    pub fn invalid_credential() -> Self {
        Self::new(ErrorKind::Authentication, "Invalid token")
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
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
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
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
