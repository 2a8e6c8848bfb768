//! Subtask record and its status lifecycle.

use super::error::{ExecutionDomainError, ParseSubtaskStatusError};
use super::ids::{SubtaskId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    /// Not yet picked up by a run.
    Waiting,
    /// Currently being executed.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully; eligible for retry.
    Failed,
}

impl SubtaskStatus {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` when the lifecycle permits moving to `target`.
    ///
    /// `in_progress -> in_progress` re-entry covers retrying a subtask that
    /// a stopped run left in flight; `failed -> in_progress` covers a
    /// targeted retry. `completed` is final.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting | Self::Failed, Self::InProgress)
                | (
                    Self::InProgress,
                    Self::InProgress | Self::Completed | Self::Failed
                )
        )
    }
}

impl std::fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SubtaskStatus {
    type Error = ParseSubtaskStatusError;

    fn try_from(value: &str) -> Result<Self, ParseSubtaskStatusError> {
        match value {
            "waiting" => Ok(Self::Waiting),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseSubtaskStatusError(other.to_owned())),
        }
    }
}

/// One unit of delegated work within a task.
///
/// Subtask records are owned by the collaborating planning store; this type
/// carries the fields execution orchestration reads and writes. Runs pick
/// up subtasks in ascending `position` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    /// Subtask identifier.
    pub id: SubtaskId,
    /// Task the subtask belongs to.
    pub task_id: TaskId,
    /// Short imperative description of the work.
    pub title: String,
    /// Longer description given to the agent, possibly empty.
    pub description: String,
    /// Execution order within the task, ascending.
    pub position: u32,
    /// Current lifecycle status.
    pub status: SubtaskStatus,
    /// When execution last began.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution last finished, successfully or not.
    pub finished_at: Option<DateTime<Utc>>,
    /// Human-readable failure text from the last failed attempt.
    pub error: Option<String>,
}

impl Subtask {
    /// Creates a waiting subtask.
    #[must_use]
    pub fn new(task_id: TaskId, title: impl Into<String>, position: u32) -> Self {
        Self {
            id: SubtaskId::new(),
            task_id,
            title: title.into(),
            description: String::new(),
            position,
            status: SubtaskStatus::Waiting,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Sets the longer description given to the agent.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Begins (or retries) execution: moves to `in_progress`, stamps
    /// `started_at`, and clears the outcome of any previous attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidSubtaskTransition`] when the
    /// subtask has already completed.
    pub fn begin(&mut self, clock: &impl Clock) -> Result<(), ExecutionDomainError> {
        self.transition_to(SubtaskStatus::InProgress)?;
        self.started_at = Some(clock.utc());
        self.finished_at = None;
        self.error = None;
        Ok(())
    }

    /// Marks execution as finished successfully.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidSubtaskTransition`] unless the
    /// subtask is in progress.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), ExecutionDomainError> {
        self.transition_to(SubtaskStatus::Completed)?;
        self.finished_at = Some(clock.utc());
        Ok(())
    }

    /// Marks execution as failed with the given error text.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidSubtaskTransition`] unless the
    /// subtask is in progress.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ExecutionDomainError> {
        self.transition_to(SubtaskStatus::Failed)?;
        self.finished_at = Some(clock.utc());
        self.error = Some(error.into());
        Ok(())
    }

    fn transition_to(&mut self, target: SubtaskStatus) -> Result<(), ExecutionDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(ExecutionDomainError::InvalidSubtaskTransition {
                subtask_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}
