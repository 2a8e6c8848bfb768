//! Port definition for agent backend clients.
//!
//! An [`AgentClient`] adapts one coding-agent backend (Claude Code,
//! OpenCode, a test stub) to a uniform session surface. Implementations are
//! expected to be cheap to clone behind an `Arc` and safe to share across
//! tasks.

use crate::session::domain::{
    AgentSession, MessageRole, PermissionMode, ServiceName, SessionId, SessionMessage,
    SessionMetadata, SessionScope, SessionStatus,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result alias for backend client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by agent backend clients.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The backend process or endpoint could not be reached.
    #[error("backend service '{service}' is unavailable: {reason}")]
    BackendUnavailable {
        /// Service that failed to respond.
        service: ServiceName,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The requested scope cannot be satisfied by this backend.
    #[error("invalid session scope: {0}")]
    InvalidScope(String),

    /// No session with the given identifier exists on the backend.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session is paused and rejects new messages until resumed.
    #[error("session {0} is paused and not accepting messages")]
    SessionPaused(SessionId),

    /// The session has terminated and rejects new messages.
    #[error("session {0} is stopped and not accepting messages")]
    SessionStopped(SessionId),

    /// The backend accepted the request but failed while serving it.
    #[error("backend failure: {0}")]
    Backend(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl ClientError {
    /// Wraps an arbitrary backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

/// Parameters for creating a new agent session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSessionSpec {
    /// Human-readable session title.
    pub title: Option<String>,
    /// Model to pin the session to; `None` lets the backend choose.
    pub model: Option<String>,
    /// Orchestration scope to encode into session metadata.
    pub scope: Option<SessionScope>,
    /// Additional metadata entries to persist alongside the scope.
    pub metadata: Option<SessionMetadata>,
    /// Tools the agent is allowed to use; empty grants the backend default.
    pub allowed_tools: Vec<String>,
    /// Autonomy granted over the working tree.
    pub permission_mode: PermissionMode,
}

impl NewSessionSpec {
    /// Creates an empty spec with read-only permissions.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            title: None,
            model: None,
            scope: None,
            metadata: None,
            allowed_tools: Vec::new(),
            permission_mode: PermissionMode::ReadOnly,
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

    /// Sets the orchestration scope.
    #[must_use]
    pub fn with_scope(mut self, scope: SessionScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets additional metadata entries.
    #[must_use]
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Grants the agent a specific tool set.
    #[must_use]
    pub fn with_allowed_tools(mut self, tools: impl IntoIterator<Item = String>) -> Self {
        self.allowed_tools = tools.into_iter().collect();
        self
    }

    /// Sets the autonomy granted over the working tree.
    #[must_use]
    pub const fn with_permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = mode;
        self
    }
}

/// Filter for listing sessions on a backend.
///
/// Scope and metadata constraints require an exact match on every provided
/// field; absent fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionQuery {
    /// Require these scope fields to match.
    pub scope: Option<SessionScope>,
    /// Require these metadata entries to match.
    pub metadata: Option<SessionMetadata>,
    /// Require this exact status.
    pub status: Option<SessionStatus>,
    /// Keep at most this many sessions, most recent first.
    pub limit: Option<usize>,
}

impl SessionQuery {
    /// Creates an unconstrained query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scope: None,
            metadata: None,
            status: None,
            limit: None,
        }
    }

    /// Requires the given scope fields to match.
    #[must_use]
    pub fn with_scope(mut self, scope: SessionScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Requires the given metadata entries to match.
    #[must_use]
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Requires the given status.
    #[must_use]
    pub const fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Caps the number of sessions returned.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Uniform session surface over one agent backend.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Name of the backend service this client talks to.
    fn service(&self) -> &ServiceName;

    /// Creates a new session on the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BackendUnavailable`] when the backend cannot
    /// be reached and [`ClientError::InvalidScope`] when the requested scope
    /// cannot be satisfied.
    async fn create_session(&self, spec: NewSessionSpec) -> ClientResult<AgentSession>;

    /// Lists sessions matching the query, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BackendUnavailable`] when the backend cannot
    /// be reached.
    async fn list_sessions(&self, query: SessionQuery) -> ClientResult<Vec<AgentSession>>;

    /// Fetches a single session, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BackendUnavailable`] when the backend cannot
    /// be reached.
    async fn get_session(&self, id: &SessionId) -> ClientResult<Option<AgentSession>>;

    /// Closes a session, releasing backend resources. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the session does not
    /// exist.
    async fn close_session(&self, id: &SessionId) -> ClientResult<()>;

    /// Requests a best-effort abort of in-flight work. Idempotent; an
    /// in-flight message may still complete before the backend honours the
    /// abort.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the session does not
    /// exist.
    async fn request_stop(&self, id: &SessionId) -> ClientResult<()>;

    /// Suspends the session so it rejects new messages. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the session does not
    /// exist.
    async fn pause_session(&self, id: &SessionId) -> ClientResult<()>;

    /// Resumes a paused session. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the session does not
    /// exist.
    async fn resume_session(&self, id: &SessionId) -> ClientResult<()>;

    /// Returns the session transcript ordered oldest first. A limit keeps
    /// only the newest messages while preserving that order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the session does not
    /// exist.
    async fn get_messages(
        &self,
        id: &SessionId,
        limit: Option<usize>,
    ) -> ClientResult<Vec<SessionMessage>>;

    /// Appends a message to the session and returns the agent's reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] when the session does not
    /// exist, [`ClientError::SessionPaused`] or
    /// [`ClientError::SessionStopped`] when the session is not accepting
    /// input, and [`ClientError::Backend`] when the agent fails to reply.
    async fn send_message(
        &self,
        id: &SessionId,
        role: MessageRole,
        content: String,
        metadata: Option<SessionMetadata>,
    ) -> ClientResult<SessionMessage>;
}
