//! Messages exchanged within an agent session.

use super::ids::{MessageId, SessionId};
use super::metadata::SessionMetadata;
use super::role::MessageRole;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A single message in an agent session's transcript.
///
/// Messages are append-only: once a backend has recorded one it is never
/// edited, so the struct is a plain record with public fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Backend-assigned message identifier.
    pub id: MessageId,
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Author of the message.
    pub role: MessageRole,
    /// Message body as plain text.
    pub content: String,
    /// Optional flat metadata recorded with the message.
    #[serde(default, skip_serializing_if = "SessionMetadata::is_empty")]
    pub metadata: SessionMetadata,
    /// When the backend recorded the message.
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(
        id: MessageId,
        session_id: SessionId,
        role: MessageRole,
        content: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            session_id,
            role,
            content: content.into(),
            metadata: SessionMetadata::new(),
            created_at: clock.utc(),
        }
    }

    /// Attaches metadata to the message.
    #[must_use]
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
