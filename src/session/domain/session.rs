//! Agent session aggregate and its status lifecycle.

use super::error::{ParsePermissionModeError, ParseSessionStatusError};
use super::ids::SessionId;
use super::metadata::SessionMetadata;
use super::scope::{SessionScope, decode_scope};
use super::service_name::ServiceName;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created and waiting for input.
    Idle,
    /// Processing a message.
    Running,
    /// Suspended; input is rejected until resumed.
    Paused,
    /// Terminated by a stop request or closure.
    Stopped,
    /// Terminated by a backend failure.
    Failed,
    /// Finished its work normally.
    Completed,
}

impl SessionStatus {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }

    /// Returns `true` for statuses a session can never leave.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::Completed)
    }

    /// Returns `true` when the session will accept a new message.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Idle | Self::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SessionStatus {
    type Error = ParseSessionStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "stopped" => Ok(Self::Stopped),
            "failed" => Ok(Self::Failed),
            "completed" => Ok(Self::Completed),
            other => Err(ParseSessionStatusError(other.to_owned())),
        }
    }
}

/// How much autonomy a new session is granted over the working tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    /// The agent may inspect but not modify anything.
    #[default]
    ReadOnly,
    /// File edits are applied without prompting; commands still prompt.
    AcceptEdits,
    /// File edits and command execution proceed without prompting.
    Autonomous,
}

impl PermissionMode {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::AcceptEdits => "accept_edits",
            Self::Autonomous => "autonomous",
        }
    }
}

impl std::fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PermissionMode {
    type Error = ParsePermissionModeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "read_only" => Ok(Self::ReadOnly),
            "accept_edits" => Ok(Self::AcceptEdits),
            "autonomous" => Ok(Self::Autonomous),
            other => Err(ParsePermissionModeError(other.to_owned())),
        }
    }
}

/// A conversation with one agent backend.
///
/// The orchestrator's scope fields live encoded inside [`Self::metadata`];
/// [`Self::scope`] decodes them on demand so there is a single source of
/// truth. Status mutators return `true` when they changed the session and
/// `false` when the call was a no-op, which keeps pause/resume idempotent.
///
/// # Examples
///
/// ```
/// use gropius::session::domain::{AgentSession, ServiceName, SessionId, SessionStatus};
/// use mockable::DefaultClock;
///
/// let clock = DefaultClock;
/// let service = ServiceName::new("claude_code")?;
/// let mut session = AgentSession::new(SessionId::new("sess-1"), service, &clock);
/// assert_eq!(session.status, SessionStatus::Idle);
/// assert!(session.pause(&clock));
/// assert!(!session.pause(&clock));
/// assert!(session.resume(&clock));
/// # Ok::<(), gropius::session::domain::SessionDomainError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSession {
    /// Backend-assigned session identifier.
    pub id: SessionId,
    /// Backend service the session runs on.
    pub service: ServiceName,
    /// Human-readable session title.
    pub title: Option<String>,
    /// Model the backend was asked to use, if pinned.
    pub model: Option<String>,
    /// Flat metadata persisted by the backend, including encoded scope.
    pub metadata: SessionMetadata,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Whether an abort has been requested for in-flight work.
    pub stop_requested: bool,
    /// Last time the backend reported activity.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Text of the most recent backend failure, if any.
    pub last_error: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last modified.
    pub updated_at: DateTime<Utc>,
}

impl AgentSession {
    /// Creates an idle session stamped with the current time.
    #[must_use]
    pub fn new(id: SessionId, service: ServiceName, clock: &impl Clock) -> Self {
        let now = clock.utc();
        Self {
            id,
            service,
            title: None,
            model: None,
            metadata: SessionMetadata::new(),
            status: SessionStatus::Idle,
            stop_requested: false,
            last_heartbeat_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the session title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Pins the model the backend should use.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replaces the session metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Decodes the orchestration scope out of the session metadata.
    #[must_use]
    pub fn scope(&self) -> Option<SessionScope> {
        decode_scope(Some(&self.metadata))
    }

    /// Marks the session as processing a message. No-op unless idle.
    pub fn begin_running(&mut self, clock: &impl Clock) -> bool {
        if self.status != SessionStatus::Idle {
            return false;
        }
        self.status = SessionStatus::Running;
        self.touch(clock);
        true
    }

    /// Returns the session to idle after a message completes. No-op unless
    /// running.
    pub fn become_idle(&mut self, clock: &impl Clock) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }
        self.status = SessionStatus::Idle;
        self.touch(clock);
        true
    }

    /// Suspends the session. No-op unless idle or running.
    pub fn pause(&mut self, clock: &impl Clock) -> bool {
        if !self.status.accepts_input() {
            return false;
        }
        self.status = SessionStatus::Paused;
        self.touch(clock);
        true
    }

    /// Resumes a paused session back to idle. No-op unless paused.
    pub fn resume(&mut self, clock: &impl Clock) -> bool {
        if self.status != SessionStatus::Paused {
            return false;
        }
        self.status = SessionStatus::Idle;
        self.touch(clock);
        true
    }

    /// Records an abort request and stops the session. No-op once terminal.
    pub fn request_stop(&mut self, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.stop_requested = true;
        self.status = SessionStatus::Stopped;
        self.touch(clock);
        true
    }

    /// Stops the session without flagging an abort. No-op once terminal.
    pub fn mark_stopped(&mut self, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Stopped;
        self.touch(clock);
        true
    }

    /// Marks the session as finished normally. No-op once terminal.
    pub fn complete(&mut self, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Completed;
        self.touch(clock);
        true
    }

    /// Records a backend failure with its error text. No-op once terminal.
    pub fn fail(&mut self, message: impl Into<String>, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Failed;
        self.last_error = Some(message.into());
        self.touch(clock);
        true
    }

    /// Records backend activity at the current time.
    pub fn record_heartbeat(&mut self, clock: &impl Clock) {
        self.last_heartbeat_at = Some(clock.utc());
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
