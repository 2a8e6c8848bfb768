//! Simulated pause/resume/stop for backends without native session control.
//!
//! Some backends cannot suspend or abort a session server-side. This
//! decorator layers that control on top of any [`AgentClient`]: control
//! verbs become conversational instructions sent through the normal message
//! path, paired with a local overlay that gates later sends and rewrites
//! the reported status. The wrapped backend keeps its own idea of the
//! session; callers only ever see the overlaid view.

use crate::session::domain::{
    AgentSession, MessageRole, ServiceName, SessionId, SessionMessage, SessionMetadata,
    SessionStatus,
};
use crate::session::ports::{AgentClient, ClientError, ClientResult, NewSessionSpec, SessionQuery};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Instruction sent when a pause is requested.
pub const PAUSE_CONTROL_MESSAGE: &str = "Please pause what you are doing now. Reply with a \
     brief summary of where you stopped and wait for further instructions.";
/// Instruction sent when a paused session is resumed.
pub const RESUME_CONTROL_MESSAGE: &str = "Please continue from where you left off.";
/// Instruction sent when a stop is requested.
pub const STOP_CONTROL_MESSAGE: &str = "Please stop immediately. Do not take any further \
     actions in this session.";

#[derive(Debug, Clone, Copy, Default)]
struct ControlOverlay {
    paused: bool,
    stopped: bool,
}

/// Decorator adding simulated session control to a backend client.
#[derive(Debug)]
pub struct SimulatedControlClient<C> {
    inner: C,
    overlay: RwLock<HashMap<SessionId, ControlOverlay>>,
}

impl<C> SimulatedControlClient<C>
where
    C: AgentClient,
{
    /// Wraps a backend client.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            overlay: RwLock::new(HashMap::new()),
        }
    }

    fn overlay_for(&self, id: &SessionId) -> ClientResult<ControlOverlay> {
        let overlay = self
            .overlay
            .read()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        Ok(overlay.get(id).copied().unwrap_or_default())
    }

    fn update_overlay(
        &self,
        id: &SessionId,
        update: impl FnOnce(&mut ControlOverlay),
    ) -> ClientResult<()> {
        let mut overlay = self
            .overlay
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        update(overlay.entry(id.clone()).or_default());
        Ok(())
    }

    /// Rewrites a session's reported status through the overlay.
    fn overlay_view(&self, mut session: AgentSession) -> ClientResult<AgentSession> {
        let overlay = self.overlay_for(&session.id)?;
        if overlay.stopped {
            session.stop_requested = true;
            if !session.status.is_terminal() {
                session.status = SessionStatus::Stopped;
            }
        } else if overlay.paused && session.status.accepts_input() {
            session.status = SessionStatus::Paused;
        }
        Ok(session)
    }
}

#[async_trait]
impl<C> AgentClient for SimulatedControlClient<C>
where
    C: AgentClient,
{
    fn service(&self) -> &ServiceName {
        self.inner.service()
    }

    async fn create_session(&self, spec: NewSessionSpec) -> ClientResult<AgentSession> {
        self.inner.create_session(spec).await
    }

    async fn list_sessions(&self, query: SessionQuery) -> ClientResult<Vec<AgentSession>> {
        let requested_status = query.status;
        let limit = query.limit;
        let inner_query = SessionQuery {
            status: None,
            limit: None,
            ..query
        };
        let sessions = self.inner.list_sessions(inner_query).await?;
        let mut overlaid = Vec::with_capacity(sessions.len());
        for session in sessions {
            overlaid.push(self.overlay_view(session)?);
        }
        if let Some(status) = requested_status {
            overlaid.retain(|session| session.status == status);
        }
        if let Some(cap) = limit {
            overlaid.truncate(cap);
        }
        Ok(overlaid)
    }

    async fn get_session(&self, id: &SessionId) -> ClientResult<Option<AgentSession>> {
        match self.inner.get_session(id).await? {
            Some(session) => Ok(Some(self.overlay_view(session)?)),
            None => Ok(None),
        }
    }

    async fn close_session(&self, id: &SessionId) -> ClientResult<()> {
        self.inner.close_session(id).await
    }

    async fn request_stop(&self, id: &SessionId) -> ClientResult<()> {
        if self.inner.get_session(id).await?.is_none() {
            return Err(ClientError::SessionNotFound(id.clone()));
        }
        if self.overlay_for(id)?.stopped {
            return Ok(());
        }
        if let Err(err) = self
            .inner
            .send_message(id, MessageRole::User, STOP_CONTROL_MESSAGE.to_owned(), None)
            .await
        {
            tracing::debug!(session_id = %id, error = %err, "stop instruction was not delivered");
        }
        self.update_overlay(id, |entry| entry.stopped = true)
    }

    async fn pause_session(&self, id: &SessionId) -> ClientResult<()> {
        let overlay = self.overlay_for(id)?;
        if overlay.paused || overlay.stopped {
            return Ok(());
        }
        match self
            .inner
            .send_message(id, MessageRole::User, PAUSE_CONTROL_MESSAGE.to_owned(), None)
            .await
        {
            Ok(_) | Err(ClientError::SessionStopped(_)) => {}
            Err(err) => return Err(err),
        }
        self.update_overlay(id, |entry| entry.paused = true)
    }

    async fn resume_session(&self, id: &SessionId) -> ClientResult<()> {
        if !self.overlay_for(id)?.paused {
            return Ok(());
        }
        match self
            .inner
            .send_message(id, MessageRole::User, RESUME_CONTROL_MESSAGE.to_owned(), None)
            .await
        {
            Ok(_) | Err(ClientError::SessionStopped(_)) => {}
            Err(err) => return Err(err),
        }
        self.update_overlay(id, |entry| entry.paused = false)
    }

    async fn get_messages(
        &self,
        id: &SessionId,
        limit: Option<usize>,
    ) -> ClientResult<Vec<SessionMessage>> {
        self.inner.get_messages(id, limit).await
    }

    async fn send_message(
        &self,
        id: &SessionId,
        role: MessageRole,
        content: String,
        metadata: Option<SessionMetadata>,
    ) -> ClientResult<SessionMessage> {
        let overlay = self.overlay_for(id)?;
        if overlay.stopped {
            return Err(ClientError::SessionStopped(id.clone()));
        }
        if overlay.paused {
            return Err(ClientError::SessionPaused(id.clone()));
        }
        self.inner.send_message(id, role, content, metadata).await
    }
}
