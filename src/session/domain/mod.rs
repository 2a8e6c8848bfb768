//! Domain types for agent sessions.
//!
//! This module contains pure domain types with no infrastructure
//! dependencies: identifiers, the session aggregate with its status
//! lifecycle, message records, and the scope codec that embeds
//! orchestration ownership into backend-persisted metadata.

mod error;
mod ids;
mod message;
mod metadata;
mod role;
mod scope;
mod service_name;
mod session;

pub use error::{
    ParseMessageRoleError, ParsePermissionModeError, ParseSessionStatusError, SessionDomainError,
};
pub use ids::{MessageId, SessionId};
pub use message::SessionMessage;
pub use metadata::SessionMetadata;
pub use role::MessageRole;
pub use scope::{
    SCOPE_KEY_LABEL, SCOPE_KEY_PROJECT_ID, SCOPE_KEY_REPO_PATH, SCOPE_KEY_WORKSPACE_ID,
    SessionScope, decode_scope, encode_scope,
};
pub use service_name::{MAX_SERVICE_NAME_LENGTH, ServiceName};
pub use session::{AgentSession, PermissionMode, SessionStatus};
