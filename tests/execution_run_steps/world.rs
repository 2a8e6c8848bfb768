//! Shared world state for execution run BDD scenarios.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use gropius::events::EventBus;
use gropius::execution::{
    adapters::{TemplatePromptBuilder, memory::InMemoryExecutionStore},
    domain::{
        ExecutionRun, ProjectId, ProjectRecord, RunId, RunStatus, Subtask, SubtaskId,
        SubtaskStatus, TaskId, TaskRecord,
    },
    ports::{ExecutionStore, RunPatch, StoreResult, SubtaskPatch},
    services::{ExecutionService, RunOutcome, StopOutcome},
};
use gropius::session::{
    adapters::memory::InMemoryAgentClient,
    domain::ServiceName,
    ports::{AgentClient, BackendConfig, ClientFactory, ClientResult},
    services::{ClientRegistry, SessionService},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestExecutionService = ExecutionService<BoundaryStopStore, DefaultClock>;

/// Factory handing out clones of one shared in-memory client, so
/// scenarios can script replies through their own handle.
struct FixedClientFactory {
    client: InMemoryAgentClient<DefaultClock>,
}

impl ClientFactory for FixedClientFactory {
    fn build(
        &self,
        _service: &ServiceName,
        _config: &BackendConfig,
    ) -> ClientResult<Arc<dyn AgentClient>> {
        Ok(Arc::new(self.client.clone()))
    }
}

/// Store decorator that files a stop request as soon as a subtask
/// completion is persisted, letting scenarios halt a run between
/// subtasks without racing it.
pub struct BoundaryStopStore {
    inner: Arc<InMemoryExecutionStore>,
    armed: AtomicBool,
}

impl BoundaryStopStore {
    /// Creates an inert decorator over the shared store.
    #[must_use]
    pub const fn new(inner: Arc<InMemoryExecutionStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
        }
    }

    /// Arms the gate: the next persisted completion flips the active run
    /// to `stopping`.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn flip_active_run(&self, task_id: TaskId) -> StoreResult<()> {
        let running = self
            .inner
            .find_active_run_by_task(task_id)
            .await?
            .filter(|run| run.status == RunStatus::Running);
        if let Some(run) = running {
            self.inner
                .update_run(run.id, RunPatch::new().with_status(RunStatus::Stopping))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for BoundaryStopStore {
    async fn find_active_run_by_task(&self, task_id: TaskId) -> StoreResult<Option<ExecutionRun>> {
        self.inner.find_active_run_by_task(task_id).await
    }

    async fn find_latest_run_by_task(&self, task_id: TaskId) -> StoreResult<Option<ExecutionRun>> {
        self.inner.find_latest_run_by_task(task_id).await
    }

    async fn create_run(&self, run: &ExecutionRun) -> StoreResult<()> {
        self.inner.create_run(run).await
    }

    async fn update_run(&self, id: RunId, patch: RunPatch) -> StoreResult<ExecutionRun> {
        self.inner.update_run(id, patch).await
    }

    async fn list_waiting_subtasks(&self, task_id: TaskId) -> StoreResult<Vec<Subtask>> {
        self.inner.list_waiting_subtasks(task_id).await
    }

    async fn find_subtask(&self, id: SubtaskId) -> StoreResult<Option<Subtask>> {
        self.inner.find_subtask(id).await
    }

    async fn update_subtask(&self, id: SubtaskId, patch: SubtaskPatch) -> StoreResult<Subtask> {
        let completes = patch.status == Some(SubtaskStatus::Completed);
        let subtask = self.inner.update_subtask(id, patch).await?;
        if completes && self.armed.swap(false, Ordering::SeqCst) {
            self.flip_active_run(subtask.task_id).await?;
        }
        Ok(subtask)
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<TaskRecord>> {
        self.inner.find_task(id).await
    }

    async fn find_project(&self, id: ProjectId) -> StoreResult<Option<ProjectRecord>> {
        self.inner.find_project(id).await
    }
}

/// Scenario world for unattended execution behaviour tests.
pub struct RunWorld {
    /// The execution service under test.
    pub execution: TestExecutionService,
    /// Shared store backing the service, for seeding and inspection.
    pub store: Arc<InMemoryExecutionStore>,
    /// Stop gate sitting between the service and the store.
    pub stop_gate: Arc<BoundaryStopStore>,
    /// Scripted in-memory backend client.
    pub client: InMemoryAgentClient<DefaultClock>,
    /// Backend the scenarios execute on.
    pub service_name: ServiceName,
    /// Project the task belongs to.
    pub project: ProjectRecord,
    /// Task whose subtasks the scenarios run.
    pub task: TaskRecord,
    /// Subtasks seeded for the scenario, in queue order.
    pub subtasks: Vec<Subtask>,
    /// Outcome of the last unattended run.
    pub last_outcome: Option<RunOutcome>,
    /// Outcome of the last stop request.
    pub last_stop: Option<StopOutcome>,
}

impl RunWorld {
    /// Creates a world over an in-memory backend and execution store.
    #[must_use]
    #[expect(
        clippy::expect_used,
        reason = "the backend name literal is statically valid"
    )]
    pub fn new() -> Self {
        let service_name = ServiceName::new("in_memory").expect("backend name should parse");
        let client = InMemoryAgentClient::new(service_name.clone(), Arc::new(DefaultClock));
        let registry = Arc::new(ClientRegistry::new(
            Arc::new(FixedClientFactory {
                client: client.clone(),
            }),
            [(service_name.clone(), BackendConfig::new("In-memory"))],
        ));
        let bus = EventBus::new();
        let sessions = Arc::new(SessionService::new(registry, bus.clone()));
        let store = Arc::new(InMemoryExecutionStore::new());
        let stop_gate = Arc::new(BoundaryStopStore::new(Arc::clone(&store)));
        let execution = ExecutionService::new(
            Arc::clone(&stop_gate),
            sessions,
            Arc::new(TemplatePromptBuilder::new()),
            bus,
            Arc::new(DefaultClock),
        );
        let project = ProjectRecord::new("Gropius", "/srv/checkouts/gropius");
        let task = TaskRecord::new(project.id, "Ship the adapter");
        Self {
            execution,
            store,
            stop_gate,
            client,
            service_name,
            project,
            task,
            subtasks: Vec::new(),
            last_outcome: None,
            last_stop: None,
        }
    }
}

impl Default for RunWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RunWorld {
    RunWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
