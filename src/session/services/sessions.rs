//! Session gateway publishing lifecycle events around backend operations.

use super::registry::{ClientRegistry, RegistryError};
use crate::events::{EventBus, OrchestratorEvent, SessionStopReason};
use crate::session::domain::{
    AgentSession, MessageRole, ServiceName, SessionId, SessionMessage, SessionMetadata,
};
use crate::session::ports::{AgentClient, ClientError, NewSessionSpec, SessionQuery};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionServiceError {
    /// The backend client could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The backend rejected or failed the operation.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The requested model is not offered by the backend.
    #[error("backend service '{service}' does not offer model '{model}'")]
    UnknownModel {
        /// Service the session was requested on.
        service: ServiceName,
        /// Model that was requested.
        model: String,
    },
}

/// Application service for working with agent sessions.
///
/// All session traffic flows through here rather than through raw clients,
/// so every state change is announced on the event bus as a side effect of
/// the operation that caused it. Model names are validated against the
/// backend configuration before a session is created; an unknown model is
/// rejected without touching the backend.
#[derive(Clone)]
pub struct SessionService {
    registry: Arc<ClientRegistry>,
    bus: EventBus,
}

impl SessionService {
    /// Creates the service over a client registry and event bus.
    pub const fn new(registry: Arc<ClientRegistry>, bus: EventBus) -> Self {
        Self { registry, bus }
    }

    /// The registry this service resolves clients from.
    #[must_use]
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The bus this service publishes on.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Creates a session on the named backend.
    ///
    /// A request without a model falls back to the backend's configured
    /// default.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::UnknownModel`] when the request pins
    /// a model the backend does not offer, plus any registry or client
    /// failure.
    pub async fn create_session(
        &self,
        service: &ServiceName,
        mut spec: NewSessionSpec,
    ) -> Result<AgentSession, SessionServiceError> {
        let config = self
            .registry
            .config(service)
            .ok_or_else(|| RegistryError::UnknownService(service.clone()))?;
        let model = match spec.model.take() {
            Some(model) if config.accepts_model(&model) => Some(model),
            Some(model) => {
                return Err(SessionServiceError::UnknownModel {
                    service: service.clone(),
                    model,
                });
            }
            None => config.default_model.clone(),
        };
        spec.model = model;

        let client = self.registry.get_client(service)?;
        let session = client.create_session(spec).await?;
        self.announce_status(&session);
        tracing::debug!(service = %service, session_id = %session.id, "created agent session");
        Ok(session)
    }

    /// Lists sessions on the named backend, most recent first.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn list_sessions(
        &self,
        service: &ServiceName,
        query: SessionQuery,
    ) -> Result<Vec<AgentSession>, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        Ok(client.list_sessions(query).await?)
    }

    /// Fetches one session, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn get_session(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
    ) -> Result<Option<AgentSession>, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        Ok(client.get_session(session_id).await?)
    }

    /// Returns a session transcript ordered oldest first.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn get_messages(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
        limit: Option<usize>,
    ) -> Result<Vec<SessionMessage>, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        Ok(client.get_messages(session_id, limit).await?)
    }

    /// Sends a message and returns the agent's reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionPaused`] or
    /// [`ClientError::SessionStopped`] (wrapped) when the session is not
    /// accepting input, plus any registry or client failure.
    pub async fn send_message(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
        role: MessageRole,
        content: impl Into<String> + Send,
        metadata: Option<SessionMetadata>,
    ) -> Result<SessionMessage, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        let reply = client
            .send_message(session_id, role, content.into(), metadata)
            .await?;
        let message_count = client.get_messages(session_id, None).await?.len();
        self.bus.publish(OrchestratorEvent::MessageArrived {
            session_id: session_id.clone(),
            message_count,
        });
        Ok(reply)
    }

    /// Pauses a session and returns its refreshed record.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn pause_session(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
    ) -> Result<Option<AgentSession>, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        client.pause_session(session_id).await?;
        self.refresh_and_announce(client.as_ref(), session_id).await
    }

    /// Resumes a paused session and returns its refreshed record.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn resume_session(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
    ) -> Result<Option<AgentSession>, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        client.resume_session(session_id).await?;
        self.refresh_and_announce(client.as_ref(), session_id).await
    }

    /// Requests a best-effort abort of in-flight work.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn request_stop(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
    ) -> Result<Option<AgentSession>, SessionServiceError> {
        let client = self.registry.get_client(service)?;
        client.request_stop(session_id).await?;
        let session = self.refresh_and_announce(client.as_ref(), session_id).await?;
        self.bus.publish(OrchestratorEvent::SessionStopped {
            session_id: session_id.clone(),
            reason: SessionStopReason::Requested,
        });
        Ok(session)
    }

    /// Closes a session, releasing backend resources.
    ///
    /// # Errors
    ///
    /// Returns any registry or client failure.
    pub async fn close_session(
        &self,
        service: &ServiceName,
        session_id: &SessionId,
    ) -> Result<(), SessionServiceError> {
        let client = self.registry.get_client(service)?;
        client.close_session(session_id).await?;
        self.bus.publish(OrchestratorEvent::SessionStopped {
            session_id: session_id.clone(),
            reason: SessionStopReason::Closed,
        });
        Ok(())
    }

    async fn refresh_and_announce(
        &self,
        client: &dyn AgentClient,
        session_id: &SessionId,
    ) -> Result<Option<AgentSession>, SessionServiceError> {
        let session = client.get_session(session_id).await?;
        if let Some(refreshed) = &session {
            self.announce_status(refreshed);
        }
        Ok(session)
    }

    fn announce_status(&self, session: &AgentSession) {
        self.bus.publish(OrchestratorEvent::SessionStatusChanged {
            session_id: session.id.clone(),
            status: session.status,
            stop_requested: session.stop_requested,
        });
    }
}
