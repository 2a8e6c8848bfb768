//! Behavioural integration tests for the in-memory orchestration stack.
//!
//! These tests run the execution service against the real session service
//! and the in-memory backend client, covering a full unattended run and a
//! stop request arriving while a subtask's prompt is in flight.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gropius::events::{EventBus, OrchestratorEvent, StopReason};
use gropius::execution::{
    adapters::{TemplatePromptBuilder, memory::InMemoryExecutionStore},
    domain::{
        ExecutionRun, ProjectRecord, RunStatus, Subtask, SubtaskId, SubtaskStatus, TaskRecord,
    },
    ports::ExecutionStore,
    services::{ExecutionService, RunOutcome, StartAck, StartRunRequest, StopOutcome},
};
use gropius::session::{
    adapters::memory::InMemoryAgentClient,
    domain::{AgentSession, MessageRole, ServiceName, SessionId, SessionMessage, SessionMetadata},
    ports::{
        AgentClient, BackendConfig, ClientFactory, ClientResult, NewSessionSpec, SessionQuery,
    },
    services::{ClientRegistry, SessionService},
};
use mockable::DefaultClock;
use tokio::sync::{Notify, broadcast};

// ============================================================================
// Test infrastructure
// ============================================================================

/// Coordination state for parking one send mid-flight.
struct SendGate {
    /// 1-based send position to park; zero parks nothing.
    gate_on: usize,
    seen: AtomicUsize,
    entered: Notify,
    release: Notify,
}

/// Client decorator that parks a chosen send between backend delivery and
/// returning, so a test can act while the prompt is in flight.
#[derive(Clone)]
struct GatedClient {
    inner: InMemoryAgentClient<DefaultClock>,
    gate: Arc<SendGate>,
}

#[async_trait]
impl AgentClient for GatedClient {
    fn service(&self) -> &ServiceName {
        self.inner.service()
    }

    async fn create_session(&self, spec: NewSessionSpec) -> ClientResult<AgentSession> {
        self.inner.create_session(spec).await
    }

    async fn list_sessions(&self, query: SessionQuery) -> ClientResult<Vec<AgentSession>> {
        self.inner.list_sessions(query).await
    }

    async fn get_session(&self, id: &SessionId) -> ClientResult<Option<AgentSession>> {
        self.inner.get_session(id).await
    }

    async fn close_session(&self, id: &SessionId) -> ClientResult<()> {
        self.inner.close_session(id).await
    }

    async fn request_stop(&self, id: &SessionId) -> ClientResult<()> {
        self.inner.request_stop(id).await
    }

    async fn pause_session(&self, id: &SessionId) -> ClientResult<()> {
        self.inner.pause_session(id).await
    }

    async fn resume_session(&self, id: &SessionId) -> ClientResult<()> {
        self.inner.resume_session(id).await
    }

    async fn get_messages(
        &self,
        id: &SessionId,
        limit: Option<usize>,
    ) -> ClientResult<Vec<SessionMessage>> {
        self.inner.get_messages(id, limit).await
    }

    async fn send_message(
        &self,
        id: &SessionId,
        role: MessageRole,
        content: String,
        metadata: Option<SessionMetadata>,
    ) -> ClientResult<SessionMessage> {
        let position = self.gate.seen.fetch_add(1, Ordering::SeqCst) + 1;
        let reply = self.inner.send_message(id, role, content, metadata).await?;
        if position == self.gate.gate_on {
            self.gate.entered.notify_one();
            self.gate.release.notified().await;
        }
        Ok(reply)
    }
}

/// Factory handing out clones of one shared gated client.
struct GatedClientFactory {
    client: GatedClient,
}

impl ClientFactory for GatedClientFactory {
    fn build(
        &self,
        _service: &ServiceName,
        _config: &BackendConfig,
    ) -> ClientResult<Arc<dyn AgentClient>> {
        Ok(Arc::new(self.client.clone()))
    }
}

struct Stack {
    execution: ExecutionService<InMemoryExecutionStore, DefaultClock>,
    store: Arc<InMemoryExecutionStore>,
    client: InMemoryAgentClient<DefaultClock>,
    gate: Arc<SendGate>,
    bus: EventBus,
    service: ServiceName,
    task: TaskRecord,
}

/// Builds the full in-memory stack; `gate_on` picks the 1-based send to
/// park, with zero leaving every send ungated.
fn stack(gate_on: usize) -> Stack {
    let service = ServiceName::new("in_memory").expect("backend name should parse");
    let client = InMemoryAgentClient::new(service.clone(), Arc::new(DefaultClock));
    let gate = Arc::new(SendGate {
        gate_on,
        seen: AtomicUsize::new(0),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let gated = GatedClient {
        inner: client.clone(),
        gate: Arc::clone(&gate),
    };
    let registry = Arc::new(ClientRegistry::new(
        Arc::new(GatedClientFactory { client: gated }),
        [(service.clone(), BackendConfig::new("In-memory"))],
    ));
    let bus = EventBus::new();
    let sessions = Arc::new(SessionService::new(registry, bus.clone()));
    let store = Arc::new(InMemoryExecutionStore::new());
    let project = ProjectRecord::new("Gropius", "/srv/checkouts/gropius");
    let task = TaskRecord::new(project.id, "Ship the adapter");
    store.seed_project(project).expect("seeding should succeed");
    store.seed_task(task.clone()).expect("seeding should succeed");
    let execution = ExecutionService::new(
        Arc::clone(&store),
        sessions,
        Arc::new(TemplatePromptBuilder::new()),
        bus.clone(),
        Arc::new(DefaultClock),
    );
    Stack {
        execution,
        store,
        client,
        gate,
        bus,
        service,
        task,
    }
}

fn seed_subtask(stack: &Stack, title: &str, position: u32) -> Subtask {
    let subtask = Subtask::new(stack.task.id, title, position);
    stack
        .store
        .seed_subtask(subtask.clone())
        .expect("seeding should succeed");
    subtask
}

async fn latest_run(stack: &Stack) -> ExecutionRun {
    stack
        .execution
        .status(stack.task.id)
        .await
        .expect("status should succeed")
        .expect("run on record")
}

async fn stored_subtask(stack: &Stack, id: SubtaskId) -> Subtask {
    stack
        .store
        .find_subtask(id)
        .await
        .expect("lookup should succeed")
        .expect("subtask on record")
}

async fn await_execution_stopped(
    events: &mut broadcast::Receiver<OrchestratorEvent>,
) -> StopReason {
    loop {
        let event = events.recv().await.expect("event bus should stay open");
        if let OrchestratorEvent::ExecutionStopped { reason, .. } = event {
            return reason;
        }
    }
}

fn drain(events: &mut broadcast::Receiver<OrchestratorEvent>) -> Vec<OrchestratorEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

// ============================================================================
// Scenario: Full run across the real session stack
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn a_full_run_completes_subtasks_and_keeps_transcripts() {
    let stack = stack(0);
    let first = seed_subtask(&stack, "Write the parser", 1);
    let second = seed_subtask(&stack, "Wire the CLI", 2);
    let mut events = stack.bus.subscribe();

    let outcome = stack
        .execution
        .run_all(StartRunRequest::new(stack.task.id, stack.service.clone()))
        .await
        .expect("run should finalise");
    assert_eq!(outcome, RunOutcome::Completed);

    let run = latest_run(&stack).await;
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.error.is_none());

    for seeded in [&first, &second] {
        let stored = stored_subtask(&stack, seeded.id).await;
        assert_eq!(stored.status, SubtaskStatus::Completed);
        assert!(stored.finished_at.is_some());
        assert!(stored.error.is_none());
    }

    // One fresh session per subtask, each holding its own prompt and reply.
    let sessions = stack
        .client
        .list_sessions(SessionQuery::new())
        .await
        .expect("listing should succeed");
    assert_eq!(sessions.len(), 2);
    assert_eq!(stack.client.delivered_messages(), 2);

    let current = run.current_session_id.clone().expect("session attached");
    let newest = sessions.first().expect("session listed");
    assert_eq!(newest.id, current);

    let transcript = stack
        .client
        .get_messages(&current, None)
        .await
        .expect("transcript should succeed");
    let roles: Vec<MessageRole> = transcript.iter().map(|message| message.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    let prompt = transcript.first().expect("prompt message");
    assert!(prompt.content.contains("Wire the CLI"));

    let reason = await_execution_stopped(&mut events).await;
    assert_eq!(reason, StopReason::Completed);
}

// ============================================================================
// Scenario: Stop request racing an in-flight prompt
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn a_stop_during_an_in_flight_prompt_halts_before_the_next_subtask() {
    let stack = stack(2);
    let first = seed_subtask(&stack, "Write the parser", 1);
    let second = seed_subtask(&stack, "Wire the CLI", 2);
    let third = seed_subtask(&stack, "Document the flags", 3);
    let mut events = stack.bus.subscribe();

    let ack = stack
        .execution
        .spawn_all(StartRunRequest::new(stack.task.id, stack.service.clone()))
        .await
        .expect("spawn should succeed");
    let StartAck::Started { run_id } = ack else {
        panic!("expected a started run, got {ack:?}");
    };

    // The second prompt is now parked inside the backend send.
    stack.gate.entered.notified().await;

    let outcome = stack
        .execution
        .stop(stack.task.id)
        .await
        .expect("stop should succeed");
    assert_eq!(outcome, StopOutcome::Requested { run_id });

    stack.gate.release.notify_one();
    let reason = await_execution_stopped(&mut events).await;
    assert_eq!(reason, StopReason::User);

    let run = latest_run(&stack).await;
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Stopped);
    assert!(run.error.is_none());

    let completed = stored_subtask(&stack, first.id).await;
    assert_eq!(completed.status, SubtaskStatus::Completed);
    let parked = stored_subtask(&stack, second.id).await;
    assert_eq!(
        parked.status,
        SubtaskStatus::InProgress,
        "kept for a later retry"
    );
    assert!(parked.error.is_none());
    assert!(parked.finished_at.is_none());
    let untouched = stored_subtask(&stack, third.id).await;
    assert_eq!(untouched.status, SubtaskStatus::Waiting);

    // The reply itself was delivered; only the completion was withheld.
    assert_eq!(stack.client.delivered_messages(), 2);

    let session_id = run.current_session_id.clone().expect("session attached");
    let session = stack
        .client
        .get_session(&session_id)
        .await
        .expect("lookup should succeed")
        .expect("session on record");
    assert!(session.stop_requested);

    let more_stops = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, OrchestratorEvent::ExecutionStopped { .. }))
        .count();
    assert_eq!(more_stops, 0, "the run announces its halt exactly once");
}
