//! Error types for session domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing session domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionDomainError {
    /// The backend service name is empty after trimming.
    #[error("backend service name must not be empty")]
    EmptyServiceName,

    /// The backend service name contains characters outside `[a-z0-9_]`.
    #[error(
        "backend service name '{0}' may only contain lowercase letters, digits, and underscores"
    )]
    InvalidServiceName(String),

    /// The backend service name exceeds the 100-character storage limit.
    #[error("backend service name exceeds 100 character limit: {0}")]
    ServiceNameTooLong(String),
}

/// Error returned while parsing a session status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent session status: {0}")]
pub struct ParseSessionStatusError(pub String);

/// Error returned while parsing a message role from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown message role: {0}")]
pub struct ParseMessageRoleError(pub String);

/// Error returned while parsing a permission mode from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown permission mode: {0}")]
pub struct ParsePermissionModeError(pub String);
