//! Unattended execution of a task's waiting subtasks.
//!
//! A run works through a snapshot of the subtasks that were waiting when it
//! started, one agent session per subtask. Stops are cooperative: a stop
//! request flips the persisted run to `stopping`, and the run halts at the
//! next subtask boundary rather than mid-conversation. The store is the
//! source of truth throughout; the service re-reads the run at every
//! boundary instead of trusting its in-memory copy.

use crate::events::{EventBus, OrchestratorEvent, StopReason};
use crate::execution::domain::{
    ExecutionDomainError, ExecutionRun, ProjectRecord, RunId, RunStatus, Subtask, SubtaskId,
    TaskId, TaskRecord,
};
use crate::execution::ports::{ExecutionStore, PromptBuilder, RunPatch, StoreError, SubtaskPatch};
use crate::session::domain::{MessageRole, PermissionMode, ServiceName, SessionScope};
use crate::session::ports::NewSessionSpec;
use crate::session::services::SessionService;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Tools granted to execution sessions.
///
/// Execution sessions may modify the working tree and run commands;
/// sessions opened by earlier workflow stages keep the default read-only
/// grant.
pub const EXECUTION_TOOL_GRANT: [&str; 4] = ["read", "write", "edit", "bash"];

/// Errors surfaced by execution operations.
#[derive(Debug, Error)]
pub enum ExecutionServiceError {
    /// A domain transition was rejected.
    #[error(transparent)]
    Domain(#[from] ExecutionDomainError),

    /// The execution store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The named subtask does not exist.
    #[error("subtask {0} not found")]
    SubtaskNotFound(SubtaskId),
}

/// Parameters for starting a run over all waiting subtasks of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct StartRunRequest {
    task_id: TaskId,
    service: ServiceName,
    model: Option<String>,
}

impl StartRunRequest {
    /// Creates a request executing the task on the given backend.
    #[must_use]
    pub const fn new(task_id: TaskId, service: ServiceName) -> Self {
        Self {
            task_id,
            service,
            model: None,
        }
    }

    /// Pins the model used for execution sessions.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Parameters for retrying one named subtask.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSubtaskRequest {
    subtask_id: SubtaskId,
    service: ServiceName,
    model: Option<String>,
}

impl StartSubtaskRequest {
    /// Creates a request executing one subtask on the given backend.
    #[must_use]
    pub const fn new(subtask_id: SubtaskId, service: ServiceName) -> Self {
        Self {
            subtask_id,
            service,
            model: None,
        }
    }

    /// Pins the model used for the execution session.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Terminal outcome of driving a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every subtask in the run's snapshot completed.
    Completed,
    /// The run halted cooperatively after a stop request.
    Stopped,
    /// A subtask failed and ended the run; the run record carries the
    /// error text.
    Failed,
    /// Another run was already active for the task; nothing started.
    AlreadyActive,
}

/// Acknowledgement returned by the background-spawning start variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAck {
    /// A run was created and is executing in the background.
    Started {
        /// Identifier of the new run.
        run_id: RunId,
    },
    /// Another run was already active for the task; nothing started.
    AlreadyActive,
}

/// Result of asking a task's active run to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The active run will halt at the next subtask boundary.
    Requested {
        /// Identifier of the stopping run.
        run_id: RunId,
    },
    /// No run was running for the task; the request had no effect.
    Ignored,
}

enum SubtaskOutcome {
    Completed,
    Stopping,
    Error(String),
}

enum LoopEnd {
    Completed,
    Stopped,
    Errored(String),
}

enum TurnResult {
    Replied,
    Failed(String),
}

/// Application service driving execution runs.
pub struct ExecutionService<S, C> {
    store: Arc<S>,
    sessions: Arc<SessionService>,
    prompts: Arc<dyn PromptBuilder>,
    bus: EventBus,
    clock: Arc<C>,
}

impl<S, C> Clone for ExecutionService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sessions: Arc::clone(&self.sessions),
            prompts: Arc::clone(&self.prompts),
            bus: self.bus.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> ExecutionService<S, C>
where
    S: ExecutionStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates the service over its collaborators.
    pub const fn new(
        store: Arc<S>,
        sessions: Arc<SessionService>,
        prompts: Arc<dyn PromptBuilder>,
        bus: EventBus,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            sessions,
            prompts,
            bus,
            clock,
        }
    }

    /// Executes every waiting subtask of a task, returning the terminal
    /// outcome.
    ///
    /// Starting is a silent no-op when the task already has an active run.
    /// The set of subtasks is snapshotted once at run start; subtasks
    /// becoming ready afterwards belong to a later run.
    ///
    /// # Errors
    ///
    /// Returns a store or domain failure when finalisation itself fails;
    /// failures while executing subtasks are recorded on the run instead.
    pub async fn run_all(
        &self,
        request: StartRunRequest,
    ) -> Result<RunOutcome, ExecutionServiceError> {
        let Some(run) = self
            .begin_run(request.task_id, request.service, request.model)
            .await?
        else {
            return Ok(RunOutcome::AlreadyActive);
        };
        self.drive_all(run).await
    }

    /// Starts [`Self::run_all`] in the background, returning immediately.
    ///
    /// # Errors
    ///
    /// Returns a store failure when the run cannot be created.
    pub async fn spawn_all(
        &self,
        request: StartRunRequest,
    ) -> Result<StartAck, ExecutionServiceError> {
        let Some(run) = self
            .begin_run(request.task_id, request.service, request.model)
            .await?
        else {
            return Ok(StartAck::AlreadyActive);
        };
        let run_id = run.id;
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.drive_all(run).await {
                tracing::error!(run_id = %run_id, error = %err, "background execution run failed");
            }
        });
        Ok(StartAck::Started { run_id })
    }

    /// Executes exactly one named subtask under a fresh run, returning the
    /// terminal outcome. Used to retry a failed subtask without re-running
    /// the rest of the task.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionServiceError::SubtaskNotFound`] when the subtask
    /// does not exist, and store or domain failures as in
    /// [`Self::run_all`].
    pub async fn run_single(
        &self,
        request: StartSubtaskRequest,
    ) -> Result<RunOutcome, ExecutionServiceError> {
        let Some(subtask) = self.store.find_subtask(request.subtask_id).await? else {
            return Err(ExecutionServiceError::SubtaskNotFound(request.subtask_id));
        };
        let Some(run) = self
            .begin_run(subtask.task_id, request.service, request.model)
            .await?
        else {
            return Ok(RunOutcome::AlreadyActive);
        };
        self.drive_single(run, subtask).await
    }

    /// Starts [`Self::run_single`] in the background, returning
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionServiceError::SubtaskNotFound`] when the subtask
    /// does not exist, and a store failure when the run cannot be created.
    pub async fn spawn_single(
        &self,
        request: StartSubtaskRequest,
    ) -> Result<StartAck, ExecutionServiceError> {
        let Some(subtask) = self.store.find_subtask(request.subtask_id).await? else {
            return Err(ExecutionServiceError::SubtaskNotFound(request.subtask_id));
        };
        let Some(run) = self
            .begin_run(subtask.task_id, request.service, request.model)
            .await?
        else {
            return Ok(StartAck::AlreadyActive);
        };
        let run_id = run.id;
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.drive_single(run, subtask).await {
                tracing::error!(run_id = %run_id, error = %err, "background subtask run failed");
            }
        });
        Ok(StartAck::Started { run_id })
    }

    /// Asks the task's active run to halt at the next subtask boundary.
    ///
    /// Ignored unless a run in status `running` exists. The stop is also
    /// forwarded to the session currently in flight on a best-effort
    /// basis; the in-flight message may still complete before the backend
    /// honours the abort.
    ///
    /// # Errors
    ///
    /// Returns a store or domain failure when the stop cannot be recorded.
    pub async fn stop(&self, task_id: TaskId) -> Result<StopOutcome, ExecutionServiceError> {
        let Some(mut run) = self.store.find_active_run_by_task(task_id).await? else {
            return Ok(StopOutcome::Ignored);
        };
        if run.status != RunStatus::Running {
            return Ok(StopOutcome::Ignored);
        }
        run.request_stop(&*self.clock)?;
        self.store.update_run(run.id, RunPatch::from_run(&run)).await?;
        tracing::debug!(task_id = %task_id, run_id = %run.id, "stop requested for active run");
        if let Some(session_id) = run.current_session_id.clone() {
            if let Err(err) = self.sessions.request_stop(&run.service, &session_id).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %err,
                    "failed to forward stop to execution session"
                );
            }
        }
        Ok(StopOutcome::Requested { run_id: run.id })
    }

    /// Returns the task's most recent run, active or terminal, or `None`
    /// when the task has never been executed.
    ///
    /// # Errors
    ///
    /// Returns a store failure when the run cannot be read.
    pub async fn status(
        &self,
        task_id: TaskId,
    ) -> Result<Option<ExecutionRun>, ExecutionServiceError> {
        Ok(self.store.find_latest_run_by_task(task_id).await?)
    }

    /// Creates and announces a run unless the task already has an active
    /// one.
    ///
    /// The activity read is only a fast path. The store re-checks inside
    /// [`ExecutionStore::create_run`], closing the window between the read
    /// and the insert when two starts race.
    async fn begin_run(
        &self,
        task_id: TaskId,
        service: ServiceName,
        model: Option<String>,
    ) -> Result<Option<ExecutionRun>, ExecutionServiceError> {
        if self.store.find_active_run_by_task(task_id).await?.is_some() {
            tracing::debug!(task_id = %task_id, "task already has an active run");
            return Ok(None);
        }
        let run = ExecutionRun::new(task_id, service, model, &*self.clock);
        match self.store.create_run(&run).await {
            Ok(()) => {}
            Err(StoreError::ActiveRunExists(_)) => {
                tracing::debug!(task_id = %task_id, "a concurrent start already created a run");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
        self.bus.publish(OrchestratorEvent::ExecutionStarted {
            task_id,
            run_id: run.id,
        });
        tracing::info!(task_id = %task_id, run_id = %run.id, "execution run started");
        Ok(Some(run))
    }

    async fn drive_all(&self, mut run: ExecutionRun) -> Result<RunOutcome, ExecutionServiceError> {
        let end = end_or_error(self.execute_waiting(&mut run).await);
        self.finalize_run(run, end).await
    }

    async fn drive_single(
        &self,
        mut run: ExecutionRun,
        mut subtask: Subtask,
    ) -> Result<RunOutcome, ExecutionServiceError> {
        let end = end_or_error(self.execute_one(&mut run, &mut subtask).await);
        self.finalize_run(run, end).await
    }

    async fn execute_waiting(
        &self,
        run: &mut ExecutionRun,
    ) -> Result<LoopEnd, ExecutionServiceError> {
        let snapshot = self.store.list_waiting_subtasks(run.task_id).await?;
        tracing::debug!(
            run_id = %run.id,
            subtasks = snapshot.len(),
            "captured snapshot of waiting subtasks"
        );
        for mut subtask in snapshot {
            if !self.boundary_continue(run).await? {
                return Ok(LoopEnd::Stopped);
            }
            match self.execute_subtask(run, &mut subtask).await? {
                SubtaskOutcome::Completed => {}
                SubtaskOutcome::Stopping => return Ok(LoopEnd::Stopped),
                SubtaskOutcome::Error(message) => return Ok(LoopEnd::Errored(message)),
            }
        }
        Ok(LoopEnd::Completed)
    }

    async fn execute_one(
        &self,
        run: &mut ExecutionRun,
        subtask: &mut Subtask,
    ) -> Result<LoopEnd, ExecutionServiceError> {
        if !self.boundary_continue(run).await? {
            return Ok(LoopEnd::Stopped);
        }
        Ok(match self.execute_subtask(run, subtask).await? {
            SubtaskOutcome::Completed => LoopEnd::Completed,
            SubtaskOutcome::Stopping => LoopEnd::Stopped,
            SubtaskOutcome::Error(message) => LoopEnd::Errored(message),
        })
    }

    /// Executes one subtask end to end: bookkeeping, session, prompt,
    /// reply, and the post-reply stop re-check.
    async fn execute_subtask(
        &self,
        run: &mut ExecutionRun,
        subtask: &mut Subtask,
    ) -> Result<SubtaskOutcome, ExecutionServiceError> {
        self.begin_subtask(run, subtask).await?;
        let Some(task) = self.store.find_task(run.task_id).await? else {
            return Ok(SubtaskOutcome::Error(format!(
                "task {} no longer exists",
                run.task_id
            )));
        };
        let Some(project) = self.store.find_project(task.project_id).await? else {
            return Ok(SubtaskOutcome::Error(format!(
                "project {} no longer exists for task {}",
                task.project_id, run.task_id
            )));
        };
        match self.perform_turn(run, subtask, &task, &project).await? {
            TurnResult::Failed(message) => {
                self.fail_subtask(run, subtask, &message).await?;
                Ok(SubtaskOutcome::Error(message))
            }
            TurnResult::Replied => {
                // The reply may have raced a stop request; a stopped run
                // leaves the subtask in_progress for a later retry.
                if self.boundary_continue(run).await? {
                    self.complete_subtask(run, subtask).await?;
                    Ok(SubtaskOutcome::Completed)
                } else {
                    Ok(SubtaskOutcome::Stopping)
                }
            }
        }
    }

    /// Opens the execution session and sends the subtask prompt. Backend
    /// and prompt failures become a failed turn; only store failures
    /// propagate.
    async fn perform_turn(
        &self,
        run: &mut ExecutionRun,
        subtask: &Subtask,
        task: &TaskRecord,
        project: &ProjectRecord,
    ) -> Result<TurnResult, ExecutionServiceError> {
        let scope = SessionScope::new()
            .with_project_id(project.id.into_inner())
            .with_repo_path(project.repo_path.clone())
            .with_label(format!("execute:{}:{}", run.task_id, subtask.id));
        let mut spec = NewSessionSpec::new()
            .with_title(format!("Execute: {}", subtask.title))
            .with_scope(scope)
            .with_allowed_tools(EXECUTION_TOOL_GRANT.iter().map(|tool| (*tool).to_owned()))
            .with_permission_mode(PermissionMode::Autonomous);
        if let Some(model) = &run.model {
            spec = spec.with_model(model.clone());
        }
        let session = match self.sessions.create_session(&run.service, spec).await {
            Ok(session) => session,
            Err(err) => return Ok(TurnResult::Failed(err.to_string())),
        };
        run.attach_session(session.id.clone(), &*self.clock);
        self.store
            .update_run(run.id, RunPatch::from_run(run))
            .await?;
        let prompt = match self.prompts.build(subtask, task, project) {
            Ok(prompt) => prompt,
            Err(err) => return Ok(TurnResult::Failed(err.to_string())),
        };
        match self
            .sessions
            .send_message(&run.service, &session.id, MessageRole::User, prompt, None)
            .await
        {
            Ok(_) => Ok(TurnResult::Replied),
            Err(err) => Ok(TurnResult::Failed(err.to_string())),
        }
    }

    /// Re-reads the run at a subtask boundary, refreshing the in-memory
    /// copy. Returns `false` when the run is no longer this task's active
    /// running run and execution must halt.
    async fn boundary_continue(
        &self,
        run: &mut ExecutionRun,
    ) -> Result<bool, ExecutionServiceError> {
        match self.store.find_active_run_by_task(run.task_id).await? {
            Some(live) if live.id == run.id => {
                let continuing = live.status == RunStatus::Running;
                *run = live;
                Ok(continuing)
            }
            _ => Ok(false),
        }
    }

    async fn begin_subtask(
        &self,
        run: &mut ExecutionRun,
        subtask: &mut Subtask,
    ) -> Result<(), ExecutionServiceError> {
        run.advance_to(subtask.id, &*self.clock)?;
        self.store
            .update_run(run.id, RunPatch::from_run(run))
            .await?;
        subtask.begin(&*self.clock)?;
        self.store
            .update_subtask(subtask.id, SubtaskPatch::from_subtask(subtask))
            .await?;
        self.bus.publish(OrchestratorEvent::SubtaskStarted {
            task_id: run.task_id,
            subtask_id: subtask.id,
        });
        self.publish_subtask_updated(subtask);
        Ok(())
    }

    async fn complete_subtask(
        &self,
        run: &ExecutionRun,
        subtask: &mut Subtask,
    ) -> Result<(), ExecutionServiceError> {
        subtask.complete(&*self.clock)?;
        self.store
            .update_subtask(subtask.id, SubtaskPatch::from_subtask(subtask))
            .await?;
        self.bus.publish(OrchestratorEvent::SubtaskCompleted {
            task_id: run.task_id,
            subtask_id: subtask.id,
        });
        self.publish_subtask_updated(subtask);
        Ok(())
    }

    async fn fail_subtask(
        &self,
        run: &ExecutionRun,
        subtask: &mut Subtask,
        message: &str,
    ) -> Result<(), ExecutionServiceError> {
        subtask.fail(message, &*self.clock)?;
        self.store
            .update_subtask(subtask.id, SubtaskPatch::from_subtask(subtask))
            .await?;
        self.bus.publish(OrchestratorEvent::SubtaskFailed {
            task_id: run.task_id,
            subtask_id: subtask.id,
            error: message.to_owned(),
        });
        self.publish_subtask_updated(subtask);
        Ok(())
    }

    /// The single place a run's terminal status is written and its
    /// `execution stopped` event published.
    async fn finalize_run(
        &self,
        mut run: ExecutionRun,
        end: LoopEnd,
    ) -> Result<RunOutcome, ExecutionServiceError> {
        let (outcome, reason) = match end {
            LoopEnd::Completed => {
                run.complete(&*self.clock)?;
                (RunOutcome::Completed, StopReason::Completed)
            }
            LoopEnd::Stopped => {
                if run.status == RunStatus::Running {
                    run.request_stop(&*self.clock)?;
                }
                run.mark_stopped(&*self.clock)?;
                (RunOutcome::Stopped, StopReason::User)
            }
            LoopEnd::Errored(message) => {
                run.fail(message, &*self.clock)?;
                (RunOutcome::Failed, StopReason::Error)
            }
        };
        self.store
            .update_run(run.id, RunPatch::from_run(&run))
            .await?;
        self.bus.publish(OrchestratorEvent::ExecutionStopped {
            task_id: run.task_id,
            reason,
        });
        tracing::info!(
            run_id = %run.id,
            task_id = %run.task_id,
            status = %run.status,
            "execution run finalised"
        );
        Ok(outcome)
    }

    fn publish_subtask_updated(&self, subtask: &Subtask) {
        self.bus.publish(OrchestratorEvent::SubtaskUpdated {
            subtask_id: subtask.id,
            task_id: subtask.task_id,
        });
    }
}

fn end_or_error(result: Result<LoopEnd, ExecutionServiceError>) -> LoopEnd {
    result.unwrap_or_else(|err| LoopEnd::Errored(err.to_string()))
}
