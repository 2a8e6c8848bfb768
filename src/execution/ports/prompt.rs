//! Port definition for execution prompt building.

use crate::execution::domain::{ProjectRecord, Subtask, TaskRecord};
use thiserror::Error;

/// Errors surfaced while building a prompt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PromptError {
    /// The prompt template failed to render.
    #[error("failed to render execution prompt: {0}")]
    Render(String),
}

/// Builds the prompt sent to an agent for one subtask.
///
/// Building is pure: the same subtask, task, and project always yield the
/// same prompt, and no I/O happens here.
pub trait PromptBuilder: Send + Sync {
    /// Renders the prompt for a subtask in its task and project context.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Render`] when the template cannot be
    /// rendered.
    fn build(
        &self,
        subtask: &Subtask,
        task: &TaskRecord,
        project: &ProjectRecord,
    ) -> Result<String, PromptError>;
}
