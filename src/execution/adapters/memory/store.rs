//! In-memory execution store used by tests and local development.

use crate::execution::domain::{
    ExecutionRun, ProjectId, ProjectRecord, RunId, Subtask, SubtaskId, SubtaskStatus, TaskId,
    TaskRecord,
};
use crate::execution::ports::{ExecutionStore, RunPatch, StoreError, StoreResult, SubtaskPatch};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct StoreState {
    runs: HashMap<RunId, ExecutionRun>,
    run_order: HashMap<TaskId, Vec<RunId>>,
    subtasks: HashMap<SubtaskId, Subtask>,
    tasks: HashMap<TaskId, TaskRecord>,
    projects: HashMap<ProjectId, ProjectRecord>,
}

/// In-memory [`ExecutionStore`] over shared mutable state.
///
/// Clones share the same state, mirroring how a combined store would expose
/// one database to many services. Seeding helpers let tests arrange tasks,
/// projects, and subtasks without a planning service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutionStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryExecutionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a project record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the state lock is poisoned.
    pub fn seed_project(&self, project: ProjectRecord) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        state.projects.insert(project.id, project);
        Ok(())
    }

    /// Inserts or replaces a task record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the state lock is poisoned.
    pub fn seed_task(&self, task: TaskRecord) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        state.tasks.insert(task.id, task);
        Ok(())
    }

    /// Inserts or replaces a subtask record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the state lock is poisoned.
    pub fn seed_subtask(&self, subtask: Subtask) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        state.subtasks.insert(subtask.id, subtask);
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn find_active_run_by_task(&self, task_id: TaskId) -> StoreResult<Option<ExecutionRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(state.run_order.get(&task_id).and_then(|order| {
            order
                .iter()
                .filter_map(|id| state.runs.get(id))
                .find(|run| run.status.is_active())
                .cloned()
        }))
    }

    async fn find_latest_run_by_task(&self, task_id: TaskId) -> StoreResult<Option<ExecutionRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(state
            .run_order
            .get(&task_id)
            .and_then(|order| order.last())
            .and_then(|id| state.runs.get(id))
            .cloned())
    }

    async fn create_run(&self, run: &ExecutionRun) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        if state.runs.contains_key(&run.id) {
            return Err(StoreError::DuplicateRun(run.id));
        }
        let has_active = state.run_order.get(&run.task_id).is_some_and(|order| {
            order
                .iter()
                .filter_map(|id| state.runs.get(id))
                .any(|existing| existing.status.is_active())
        });
        if has_active {
            return Err(StoreError::ActiveRunExists(run.task_id));
        }
        state.runs.insert(run.id, run.clone());
        state.run_order.entry(run.task_id).or_default().push(run.id);
        Ok(())
    }

    async fn update_run(&self, id: RunId, patch: RunPatch) -> StoreResult<ExecutionRun> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        let run = state.runs.get_mut(&id).ok_or(StoreError::RunNotFound(id))?;
        patch.apply(run);
        Ok(run.clone())
    }

    async fn list_waiting_subtasks(&self, task_id: TaskId) -> StoreResult<Vec<Subtask>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        let mut waiting: Vec<Subtask> = state
            .subtasks
            .values()
            .filter(|subtask| {
                subtask.task_id == task_id && subtask.status == SubtaskStatus::Waiting
            })
            .cloned()
            .collect();
        waiting.sort_by_key(|subtask| subtask.position);
        Ok(waiting)
    }

    async fn find_subtask(&self, id: SubtaskId) -> StoreResult<Option<Subtask>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(state.subtasks.get(&id).cloned())
    }

    async fn update_subtask(&self, id: SubtaskId, patch: SubtaskPatch) -> StoreResult<Subtask> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        let subtask = state
            .subtasks
            .get_mut(&id)
            .ok_or(StoreError::SubtaskNotFound(id))?;
        patch.apply(subtask);
        Ok(subtask.clone())
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<TaskRecord>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_project(&self, id: ProjectId) -> StoreResult<Option<ProjectRecord>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(state.projects.get(&id).cloned())
    }
}
