//! In-memory agent backend used by tests and local development.

use crate::session::domain::{
    AgentSession, MessageId, MessageRole, PermissionMode, ServiceName, SessionId, SessionMessage,
    SessionMetadata, SessionStatus, encode_scope,
};
use crate::session::ports::{AgentClient, ClientError, ClientResult, NewSessionSpec, SessionQuery};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Prefix of the reply produced when no scripted reply is queued.
pub const DEFAULT_REPLY_PREFIX: &str = "echo: ";

/// Scripted behaviour for the next message sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Reply successfully with this text.
    Reply(String),
    /// Fail the send and mark the session failed with this error text.
    Fail(String),
}

/// Permission grant recorded when a session was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Autonomy the session was created with.
    pub permission_mode: PermissionMode,
    /// Tools the session was allowed to use.
    pub allowed_tools: Vec<String>,
}

#[derive(Debug)]
struct SessionRecord {
    session: AgentSession,
    messages: Vec<SessionMessage>,
    grant: SessionGrant,
    sequence: u64,
}

#[derive(Debug, Default)]
struct ClientState {
    sessions: HashMap<SessionId, SessionRecord>,
    replies: VecDeque<ScriptedReply>,
    next_session: u64,
    next_message: u64,
}

/// In-memory [`AgentClient`] with a scripted reply queue.
///
/// Each send consumes the next [`ScriptedReply`]; with the queue empty the
/// backend echoes the prompt back. Sends that pass the pause/stop gate are
/// counted, which lets tests assert that a rejected send never reached the
/// backend at all.
#[derive(Debug)]
pub struct InMemoryAgentClient<C> {
    service: ServiceName,
    clock: Arc<C>,
    state: Arc<RwLock<ClientState>>,
    deliveries: Arc<AtomicUsize>,
}

impl<C> Clone for InMemoryAgentClient<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
            deliveries: Arc::clone(&self.deliveries),
        }
    }
}

impl<C> InMemoryAgentClient<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty backend for the given service.
    #[must_use]
    pub fn new(service: ServiceName, clock: Arc<C>) -> Self {
        Self {
            service,
            clock,
            state: Arc::new(RwLock::new(ClientState::default())),
            deliveries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues a successful reply for a future send.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Backend`] when the state lock is poisoned.
    pub fn script_reply(&self, content: impl Into<String>) -> ClientResult<()> {
        self.push_scripted(ScriptedReply::Reply(content.into()))
    }

    /// Queues a failure for a future send.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Backend`] when the state lock is poisoned.
    pub fn script_failure(&self, message: impl Into<String>) -> ClientResult<()> {
        self.push_scripted(ScriptedReply::Fail(message.into()))
    }

    /// Number of sends that passed the pause/stop gate and reached the
    /// backend.
    #[must_use]
    pub fn delivered_messages(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    /// Returns the permission grant recorded when the session was created.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Backend`] when the state lock is poisoned.
    pub fn session_grant(&self, id: &SessionId) -> ClientResult<Option<SessionGrant>> {
        let state = self
            .state
            .read()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        Ok(state.sessions.get(id).map(|record| record.grant.clone()))
    }

    fn push_scripted(&self, reply: ScriptedReply) -> ClientResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        state.replies.push_back(reply);
        Ok(())
    }
}

#[async_trait]
impl<C> AgentClient for InMemoryAgentClient<C>
where
    C: Clock + Send + Sync,
{
    fn service(&self) -> &ServiceName {
        &self.service
    }

    async fn create_session(&self, spec: NewSessionSpec) -> ClientResult<AgentSession> {
        let mut guard = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let state = &mut *guard;
        state.next_session += 1;
        let id = SessionId::new(format!("sess-{}", state.next_session));
        let metadata =
            encode_scope(spec.scope.as_ref(), spec.metadata.as_ref()).unwrap_or_default();
        let mut session = AgentSession::new(id.clone(), self.service.clone(), &*self.clock)
            .with_metadata(metadata);
        session.title = spec.title;
        session.model = spec.model;
        let record = SessionRecord {
            session: session.clone(),
            messages: Vec::new(),
            grant: SessionGrant {
                permission_mode: spec.permission_mode,
                allowed_tools: spec.allowed_tools,
            },
            sequence: state.next_session,
        };
        state.sessions.insert(id, record);
        Ok(session)
    }

    async fn list_sessions(&self, query: SessionQuery) -> ClientResult<Vec<AgentSession>> {
        let state = self
            .state
            .read()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let required = encode_scope(query.scope.as_ref(), query.metadata.as_ref());
        let mut records: Vec<&SessionRecord> = state
            .sessions
            .values()
            .filter(|record| matches_query(record, required.as_ref(), query.status))
            .collect();
        records.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(records
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|record| record.session.clone())
            .collect())
    }

    async fn get_session(&self, id: &SessionId) -> ClientResult<Option<AgentSession>> {
        let state = self
            .state
            .read()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        Ok(state.sessions.get(id).map(|record| record.session.clone()))
    }

    async fn close_session(&self, id: &SessionId) -> ClientResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let record = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ClientError::SessionNotFound(id.clone()))?;
        record.session.mark_stopped(&*self.clock);
        Ok(())
    }

    async fn request_stop(&self, id: &SessionId) -> ClientResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let record = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ClientError::SessionNotFound(id.clone()))?;
        record.session.request_stop(&*self.clock);
        Ok(())
    }

    async fn pause_session(&self, id: &SessionId) -> ClientResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let record = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ClientError::SessionNotFound(id.clone()))?;
        record.session.pause(&*self.clock);
        Ok(())
    }

    async fn resume_session(&self, id: &SessionId) -> ClientResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let record = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ClientError::SessionNotFound(id.clone()))?;
        record.session.resume(&*self.clock);
        Ok(())
    }

    async fn get_messages(
        &self,
        id: &SessionId,
        limit: Option<usize>,
    ) -> ClientResult<Vec<SessionMessage>> {
        let state = self
            .state
            .read()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let record = state
            .sessions
            .get(id)
            .ok_or_else(|| ClientError::SessionNotFound(id.clone()))?;
        let keep = limit
            .unwrap_or(record.messages.len())
            .min(record.messages.len());
        Ok(record
            .messages
            .iter()
            .skip(record.messages.len() - keep)
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        id: &SessionId,
        role: MessageRole,
        content: String,
        metadata: Option<SessionMetadata>,
    ) -> ClientResult<SessionMessage> {
        let mut guard = self
            .state
            .write()
            .map_err(|err| ClientError::backend(std::io::Error::other(err.to_string())))?;
        let state = &mut *guard;
        let record = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ClientError::SessionNotFound(id.clone()))?;
        if record.session.status == SessionStatus::Paused {
            return Err(ClientError::SessionPaused(id.clone()));
        }
        if record.session.status.is_terminal() {
            return Err(ClientError::SessionStopped(id.clone()));
        }
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        record.session.begin_running(&*self.clock);
        record.session.record_heartbeat(&*self.clock);

        state.next_message += 1;
        let mut inbound = SessionMessage::new(
            MessageId::new(format!("msg-{}", state.next_message)),
            id.clone(),
            role,
            content.clone(),
            &*self.clock,
        );
        if let Some(extra) = metadata {
            inbound = inbound.with_metadata(extra);
        }
        record.messages.push(inbound);

        let reply_text = match state.replies.pop_front() {
            Some(ScriptedReply::Fail(message)) => {
                record.session.fail(message.clone(), &*self.clock);
                return Err(ClientError::backend(std::io::Error::other(message)));
            }
            Some(ScriptedReply::Reply(text)) => text,
            None => format!("{DEFAULT_REPLY_PREFIX}{content}"),
        };
        state.next_message += 1;
        let reply = SessionMessage::new(
            MessageId::new(format!("msg-{}", state.next_message)),
            id.clone(),
            MessageRole::Assistant,
            reply_text,
            &*self.clock,
        );
        record.messages.push(reply.clone());
        record.session.become_idle(&*self.clock);
        Ok(reply)
    }
}

fn matches_query(
    record: &SessionRecord,
    required: Option<&SessionMetadata>,
    status: Option<SessionStatus>,
) -> bool {
    required.is_none_or(|needed| record.session.metadata.contains_all(needed))
        && status.is_none_or(|expected| record.session.status == expected)
}
