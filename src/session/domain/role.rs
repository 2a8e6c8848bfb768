//! Message author roles.

use super::error::ParseMessageRoleError;
use serde::{Deserialize, Serialize};

/// Author of a message within an agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Instructions injected by the orchestrator or host application.
    System,
    /// Input from the person or service driving the session.
    User,
    /// Output produced by the agent.
    Assistant,
    /// Result of a tool invocation fed back to the agent.
    Tool,
}

impl MessageRole {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = ParseMessageRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(ParseMessageRoleError(other.to_owned())),
        }
    }
}
