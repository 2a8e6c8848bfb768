//! Validated backend service name newtype.
//!
//! Service names identify which agent backend a session belongs to (for
//! example `claude_code` or `opencode`). Names are normalised to lowercase
//! and restricted to `[a-z0-9_]` so they can be used as registry keys and
//! embedded in diagnostics without quoting.

use super::error::SessionDomainError;
use serde::{Deserialize, Serialize};

/// Maximum length of a backend service name in characters.
pub const MAX_SERVICE_NAME_LENGTH: usize = 100;

/// Validated name of an agent backend service.
///
/// # Examples
///
/// ```
/// use gropius::session::domain::ServiceName;
///
/// let name = ServiceName::new("  Claude_Code ")?;
/// assert_eq!(name.as_str(), "claude_code");
/// assert!(ServiceName::new("no spaces allowed").is_err());
/// # Ok::<(), gropius::session::domain::SessionDomainError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Creates a validated service name.
    ///
    /// Input is trimmed and lowered before validation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::EmptyServiceName`] when the trimmed name
    /// is empty, [`SessionDomainError::ServiceNameTooLong`] when it exceeds
    /// [`MAX_SERVICE_NAME_LENGTH`] characters, and
    /// [`SessionDomainError::InvalidServiceName`] when it contains characters
    /// outside `[a-z0-9_]`.
    pub fn new(name: impl Into<String>) -> Result<Self, SessionDomainError> {
        let normalized = name.into().trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(SessionDomainError::EmptyServiceName);
        }
        if normalized.chars().count() > MAX_SERVICE_NAME_LENGTH {
            return Err(SessionDomainError::ServiceNameTooLong(normalized));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(SessionDomainError::InvalidServiceName(normalized));
        }
        Ok(Self(normalized))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for ServiceName {
    type Error = SessionDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = SessionDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
