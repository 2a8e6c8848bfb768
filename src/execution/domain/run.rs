//! Execution run aggregate and its status lifecycle.

use super::error::{ExecutionDomainError, ParseRunStatusError};
use super::ids::{RunId, SubtaskId, TaskId};
use crate::session::domain::{ServiceName, SessionId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an execution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Subtasks are being executed.
    Running,
    /// A stop was requested; the run will halt at the next subtask
    /// boundary.
    Stopping,
    /// Halted cooperatively after a stop request.
    Stopped,
    /// Every waiting subtask completed.
    Completed,
    /// A subtask failed or the run hit an unrecoverable error.
    Error,
}

impl RunStatus {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Returns `true` while the run occupies the task's single active slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }

    /// Returns `true` for statuses a run can never leave.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Completed | Self::Error)
    }

    /// Returns `true` when the lifecycle permits moving to `target`.
    ///
    /// `running -> running` is the self-transition taken when the run
    /// advances to its next subtask.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Running,
                Self::Running | Self::Stopping | Self::Completed | Self::Error
            ) | (Self::Stopping, Self::Stopped)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RunStatus {
    type Error = ParseRunStatusError;

    fn try_from(value: &str) -> Result<Self, ParseRunStatusError> {
        match value {
            "running" => Ok(Self::Running),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(ParseRunStatusError(other.to_owned())),
        }
    }
}

/// One execution attempt over a task's waiting subtasks.
///
/// A task has at most one active run at a time; the run tracks which
/// subtask and session are currently in flight and finishes in exactly one
/// terminal status. Mutators validate the status lifecycle and stamp
/// `updated_at`; persistence is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRun {
    /// Run identifier.
    pub id: RunId,
    /// Task being executed.
    pub task_id: TaskId,
    /// Backend service executing the subtasks.
    pub service: ServiceName,
    /// Model requested for execution sessions, if pinned.
    pub model: Option<String>,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Subtask currently in flight, kept after the run ends as a record of
    /// where it stopped.
    pub current_subtask_id: Option<SubtaskId>,
    /// Session currently in flight, kept after the run ends.
    pub current_session_id: Option<SessionId>,
    /// Human-readable failure text for runs that ended in `error`.
    pub error: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run was last modified.
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRun {
    /// Creates a running run for the given task.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        service: ServiceName,
        model: Option<String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.utc();
        Self {
            id: RunId::new(),
            task_id,
            service,
            model,
            status: RunStatus::Running,
            current_subtask_id: None,
            current_session_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances the run to its next subtask.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidRunTransition`] unless the run
    /// is running.
    pub fn advance_to(
        &mut self,
        subtask_id: SubtaskId,
        clock: &impl Clock,
    ) -> Result<(), ExecutionDomainError> {
        self.transition_to(RunStatus::Running, clock)?;
        self.current_subtask_id = Some(subtask_id);
        Ok(())
    }

    /// Records the session opened for the current subtask.
    pub fn attach_session(&mut self, session_id: SessionId, clock: &impl Clock) {
        self.current_session_id = Some(session_id);
        self.touch(clock);
    }

    /// Asks the run to halt at the next subtask boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidRunTransition`] unless the run
    /// is running.
    pub fn request_stop(&mut self, clock: &impl Clock) -> Result<(), ExecutionDomainError> {
        self.transition_to(RunStatus::Stopping, clock)
    }

    /// Finalises a stopping run as stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidRunTransition`] unless the run
    /// is stopping.
    pub fn mark_stopped(&mut self, clock: &impl Clock) -> Result<(), ExecutionDomainError> {
        self.transition_to(RunStatus::Stopped, clock)
    }

    /// Finalises the run as completed.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidRunTransition`] unless the run
    /// is running.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), ExecutionDomainError> {
        self.transition_to(RunStatus::Completed, clock)
    }

    /// Finalises the run as errored, recording the failure text.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionDomainError::InvalidRunTransition`] unless the run
    /// is running.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ExecutionDomainError> {
        self.transition_to(RunStatus::Error, clock)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition_to(
        &mut self,
        target: RunStatus,
        clock: &impl Clock,
    ) -> Result<(), ExecutionDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(ExecutionDomainError::InvalidRunTransition {
                run_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
