//! Port definition for the execution store.
//!
//! Runs, subtasks, tasks, and projects live in a store owned by the wider
//! application; execution consumes this narrow interface instead of the
//! store's full schema. Updates are expressed as patches so combined
//! store implementations can translate them into partial writes.

use crate::execution::domain::{
    ExecutionRun, ProjectId, ProjectRecord, RunId, RunStatus, Subtask, SubtaskId, SubtaskStatus,
    TaskId, TaskRecord,
};
use crate::session::domain::SessionId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result alias for execution store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by execution store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No run with the given identifier exists.
    #[error("run {0} not found")]
    RunNotFound(RunId),

    /// No subtask with the given identifier exists.
    #[error("subtask {0} not found")]
    SubtaskNotFound(SubtaskId),

    /// A run with the given identifier already exists.
    #[error("run {0} already exists")]
    DuplicateRun(RunId),

    /// The task already has a run in an active status.
    #[error("task {0} already has an active run")]
    ActiveRunExists(TaskId),

    /// The underlying storage failed.
    #[error("persistence failure: {0}")]
    Persistence(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps an arbitrary storage failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Optional update to a nullable field.
///
/// Distinguishes "leave the stored value alone" from "clear it", which a
/// plain `Option` cannot express in a patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    /// Leave the stored value unchanged.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(T),
    /// Clear the stored value.
    Clear,
}

impl<T> FieldPatch<T> {
    /// Applies the patch to a nullable slot.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *slot = Some(value),
            Self::Clear => *slot = None,
        }
    }

    /// Returns `true` when the patch leaves the slot unchanged.
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Partial update to an execution run.
///
/// Absent fields leave the stored value unchanged. Run pointers and error
/// text are never cleared: they survive as a record of where the run was
/// when it ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPatch {
    /// New lifecycle status.
    pub status: Option<RunStatus>,
    /// Subtask now in flight.
    pub current_subtask_id: Option<SubtaskId>,
    /// Session now in flight.
    pub current_session_id: Option<SessionId>,
    /// Failure text for runs ending in `error`.
    pub error: Option<String>,
    /// New modification timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

impl RunPatch {
    /// Creates an empty patch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: None,
            current_subtask_id: None,
            current_session_id: None,
            error: None,
            updated_at: None,
        }
    }

    /// Creates a patch that persists every mutable field of the run.
    ///
    /// Convenient after mutating the aggregate through its own methods.
    #[must_use]
    pub fn from_run(run: &ExecutionRun) -> Self {
        Self {
            status: Some(run.status),
            current_subtask_id: run.current_subtask_id,
            current_session_id: run.current_session_id.clone(),
            error: run.error.clone(),
            updated_at: Some(run.updated_at),
        }
    }

    /// Sets the lifecycle status.
    #[must_use]
    pub const fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the subtask in flight.
    #[must_use]
    pub const fn with_current_subtask_id(mut self, subtask_id: SubtaskId) -> Self {
        self.current_subtask_id = Some(subtask_id);
        self
    }

    /// Sets the session in flight.
    #[must_use]
    pub fn with_current_session_id(mut self, session_id: SessionId) -> Self {
        self.current_session_id = Some(session_id);
        self
    }

    /// Sets the failure text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the modification timestamp.
    #[must_use]
    pub const fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Applies the patch to a run record.
    pub fn apply(self, run: &mut ExecutionRun) {
        if let Some(status) = self.status {
            run.status = status;
        }
        if let Some(subtask_id) = self.current_subtask_id {
            run.current_subtask_id = Some(subtask_id);
        }
        if let Some(session_id) = self.current_session_id {
            run.current_session_id = Some(session_id);
        }
        if let Some(error) = self.error {
            run.error = Some(error);
        }
        if let Some(updated_at) = self.updated_at {
            run.updated_at = updated_at;
        }
    }
}

/// Partial update to a subtask.
///
/// Absent fields leave the stored value unchanged; `finished_at` and
/// `error` use [`FieldPatch`] because retrying a subtask clears the outcome
/// of its previous attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtaskPatch {
    /// New lifecycle status.
    pub status: Option<SubtaskStatus>,
    /// New execution start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Update to the execution finish time.
    pub finished_at: FieldPatch<DateTime<Utc>>,
    /// Update to the failure text.
    pub error: FieldPatch<String>,
}

impl SubtaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: None,
            started_at: None,
            finished_at: FieldPatch::Keep,
            error: FieldPatch::Keep,
        }
    }

    /// Creates a patch that persists every mutable field of the subtask.
    #[must_use]
    pub fn from_subtask(subtask: &Subtask) -> Self {
        Self {
            status: Some(subtask.status),
            started_at: subtask.started_at,
            finished_at: subtask
                .finished_at
                .map_or(FieldPatch::Clear, FieldPatch::Set),
            error: subtask
                .error
                .clone()
                .map_or(FieldPatch::Clear, FieldPatch::Set),
        }
    }

    /// Sets the lifecycle status.
    #[must_use]
    pub const fn with_status(mut self, status: SubtaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the execution start time.
    #[must_use]
    pub const fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    /// Sets the execution finish time.
    #[must_use]
    pub const fn with_finished_at(mut self, at: DateTime<Utc>) -> Self {
        self.finished_at = FieldPatch::Set(at);
        self
    }

    /// Clears the execution finish time.
    #[must_use]
    pub const fn clear_finished_at(mut self) -> Self {
        self.finished_at = FieldPatch::Clear;
        self
    }

    /// Sets the failure text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = FieldPatch::Set(error.into());
        self
    }

    /// Clears the failure text.
    #[must_use]
    pub fn clear_error(mut self) -> Self {
        self.error = FieldPatch::Clear;
        self
    }

    /// Applies the patch to a subtask record.
    pub fn apply(self, subtask: &mut Subtask) {
        if let Some(status) = self.status {
            subtask.status = status;
        }
        if let Some(started_at) = self.started_at {
            subtask.started_at = Some(started_at);
        }
        self.finished_at.apply_to(&mut subtask.finished_at);
        self.error.apply_to(&mut subtask.error);
    }
}

/// Narrow persistence interface consumed by execution orchestration.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Finds the task's active run (`running` or `stopping`), if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the underlying storage
    /// fails.
    async fn find_active_run_by_task(&self, task_id: TaskId) -> StoreResult<Option<ExecutionRun>>;

    /// Finds the task's most recently created run, active or terminal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the underlying storage
    /// fails.
    async fn find_latest_run_by_task(&self, task_id: TaskId) -> StoreResult<Option<ExecutionRun>>;

    /// Persists a new run.
    ///
    /// Implementations check the single-active-run rule atomically with the
    /// insert, so two racing starts cannot both create a run for one task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRun`] when the run identifier already
    /// exists, or [`StoreError::ActiveRunExists`] when the task already has
    /// a run in an active status.
    async fn create_run(&self, run: &ExecutionRun) -> StoreResult<()>;

    /// Applies a partial update and returns the updated run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RunNotFound`] when the run does not exist.
    async fn update_run(&self, id: RunId, patch: RunPatch) -> StoreResult<ExecutionRun>;

    /// Lists the task's waiting subtasks in ascending position order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the underlying storage
    /// fails.
    async fn list_waiting_subtasks(&self, task_id: TaskId) -> StoreResult<Vec<Subtask>>;

    /// Fetches a single subtask, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the underlying storage
    /// fails.
    async fn find_subtask(&self, id: SubtaskId) -> StoreResult<Option<Subtask>>;

    /// Applies a partial update and returns the updated subtask.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SubtaskNotFound`] when the subtask does not
    /// exist.
    async fn update_subtask(&self, id: SubtaskId, patch: SubtaskPatch) -> StoreResult<Subtask>;

    /// Fetches a task record, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the underlying storage
    /// fails.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<TaskRecord>>;

    /// Fetches a project record, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the underlying storage
    /// fails.
    async fn find_project(&self, id: ProjectId) -> StoreResult<Option<ProjectRecord>>;
}
