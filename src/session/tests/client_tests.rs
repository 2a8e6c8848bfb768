//! Behaviour tests for the in-memory agent backend.

use std::sync::Arc;

use crate::session::adapters::memory::{DEFAULT_REPLY_PREFIX, InMemoryAgentClient};
use crate::session::domain::{
    MessageRole, PermissionMode, SCOPE_KEY_LABEL, ServiceName, SessionId, SessionScope,
    SessionStatus,
};
use crate::session::ports::{AgentClient, ClientError, NewSessionSpec, SessionQuery};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type TestClient = InMemoryAgentClient<DefaultClock>;

#[fixture]
fn client() -> TestClient {
    let service = ServiceName::new("in_memory").expect("valid service name");
    InMemoryAgentClient::new(service, Arc::new(DefaultClock))
}

async fn create(client: &TestClient, spec: NewSessionSpec) -> SessionId {
    client
        .create_session(spec)
        .await
        .expect("session creation should succeed")
        .id
}

// ============================================================================
// Session creation tests
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_session_assigns_distinct_ids(client: TestClient) {
    let first = create(&client, NewSessionSpec::new()).await;
    let second = create(&client, NewSessionSpec::new()).await;
    assert_ne!(first, second);
    assert!(!first.as_str().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_session_records_the_permission_grant(client: TestClient) {
    let spec = NewSessionSpec::new()
        .with_allowed_tools(["read".to_owned(), "bash".to_owned()])
        .with_permission_mode(PermissionMode::Autonomous);
    let id = create(&client, spec).await;

    let grant = client
        .session_grant(&id)
        .expect("grant lookup should succeed")
        .expect("grant recorded at creation");
    assert_eq!(grant.permission_mode, PermissionMode::Autonomous);
    assert_eq!(grant.allowed_tools, vec!["read", "bash"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_session_encodes_scope_into_metadata(client: TestClient) {
    let scope = SessionScope::new().with_label("execute:task-1");
    let id = create(&client, NewSessionSpec::new().with_scope(scope.clone())).await;

    let session = client
        .get_session(&id)
        .await
        .expect("lookup should succeed")
        .expect("session exists");
    assert_eq!(session.metadata.get(SCOPE_KEY_LABEL), Some("execute:task-1"));
    assert_eq!(session.scope(), Some(scope));
    assert_eq!(session.status, SessionStatus::Idle);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_session_keeps_title_and_model(client: TestClient) {
    let spec = NewSessionSpec::new()
        .with_title("Execute: wire the adapter")
        .with_model("turbo");
    let id = create(&client, spec).await;

    let session = client
        .get_session(&id)
        .await
        .expect("lookup should succeed")
        .expect("session exists");
    assert_eq!(session.title.as_deref(), Some("Execute: wire the adapter"));
    assert_eq!(session.model.as_deref(), Some("turbo"));
}

// ============================================================================
// Messaging tests
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_message_echoes_when_nothing_is_scripted(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;

    let reply = client
        .send_message(&id, MessageRole::User, "hello".to_owned(), None)
        .await
        .expect("send should succeed");

    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.content, format!("{DEFAULT_REPLY_PREFIX}hello"));
    let transcript = client
        .get_messages(&id, None)
        .await
        .expect("transcript lookup should succeed");
    assert_eq!(transcript.len(), 2);
    let roles: Vec<MessageRole> = transcript.iter().map(|message| message.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn scripted_replies_are_consumed_in_order(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    client
        .script_reply("first answer")
        .expect("scripting should succeed");
    client
        .script_reply("second answer")
        .expect("scripting should succeed");

    let first = client
        .send_message(&id, MessageRole::User, "one".to_owned(), None)
        .await
        .expect("send should succeed");
    let second = client
        .send_message(&id, MessageRole::User, "two".to_owned(), None)
        .await
        .expect("send should succeed");

    assert_eq!(first.content, "first answer");
    assert_eq!(second.content, "second answer");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn scripted_failure_fails_the_session(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    client
        .script_failure("model quota exhausted")
        .expect("scripting should succeed");

    let result = client
        .send_message(&id, MessageRole::User, "hello".to_owned(), None)
        .await;
    assert!(matches!(result, Err(ClientError::Backend(_))));

    let session = client
        .get_session(&id)
        .await
        .expect("lookup should succeed")
        .expect("session exists");
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.last_error.as_deref(), Some("model quota exhausted"));
    let transcript = client
        .get_messages(&id, None)
        .await
        .expect("transcript lookup should succeed");
    assert_eq!(transcript.len(), 1, "inbound message is kept, no reply");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn get_messages_limit_returns_the_newest_tail(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    for text in ["one", "two", "three"] {
        client
            .send_message(&id, MessageRole::User, text.to_owned(), None)
            .await
            .expect("send should succeed");
    }

    let tail = client
        .get_messages(&id, Some(2))
        .await
        .expect("transcript lookup should succeed");
    assert_eq!(tail.len(), 2);
    let contents: Vec<&str> = tail.iter().map(|message| message.content.as_str()).collect();
    assert_eq!(contents, vec!["three", "echo: three"]);

    let everything = client
        .get_messages(&id, Some(100))
        .await
        .expect("transcript lookup should succeed");
    assert_eq!(everything.len(), 6);
}

// ============================================================================
// Pause, stop, and gating tests
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_to_a_paused_session_never_reaches_the_backend(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    client
        .pause_session(&id)
        .await
        .expect("pause should succeed");

    let result = client
        .send_message(&id, MessageRole::User, "hello".to_owned(), None)
        .await;

    assert!(matches!(result, Err(ClientError::SessionPaused(_))));
    assert_eq!(client.delivered_messages(), 0);
    let transcript = client
        .get_messages(&id, None)
        .await
        .expect("transcript lookup should succeed");
    assert!(transcript.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resume_restores_message_delivery(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    client
        .pause_session(&id)
        .await
        .expect("pause should succeed");
    client
        .resume_session(&id)
        .await
        .expect("resume should succeed");

    let reply = client
        .send_message(&id, MessageRole::User, "hello".to_owned(), None)
        .await
        .expect("send should succeed after resume");
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(client.delivered_messages(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_to_a_closed_session_is_rejected(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    client
        .close_session(&id)
        .await
        .expect("close should succeed");

    let result = client
        .send_message(&id, MessageRole::User, "hello".to_owned(), None)
        .await;
    assert!(matches!(result, Err(ClientError::SessionStopped(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn request_stop_sets_the_flag_and_stops_the_session(client: TestClient) {
    let id = create(&client, NewSessionSpec::new()).await;
    client
        .request_stop(&id)
        .await
        .expect("stop request should succeed");

    let session = client
        .get_session(&id)
        .await
        .expect("lookup should succeed")
        .expect("session exists");
    assert_eq!(session.status, SessionStatus::Stopped);
    assert!(session.stop_requested);
}

// ============================================================================
// Listing tests
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_sessions_filters_by_scope(client: TestClient) {
    let wanted = SessionScope::new().with_label("execute:task-1");
    let other = SessionScope::new().with_label("triage");
    let wanted_id = create(&client, NewSessionSpec::new().with_scope(wanted.clone())).await;
    create(&client, NewSessionSpec::new().with_scope(other)).await;

    let found = client
        .list_sessions(SessionQuery::new().with_scope(wanted))
        .await
        .expect("listing should succeed");

    let ids: Vec<&SessionId> = found.iter().map(|session| &session.id).collect();
    assert_eq!(ids, vec![&wanted_id]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_sessions_filters_by_status_and_orders_newest_first(client: TestClient) {
    let first = create(&client, NewSessionSpec::new()).await;
    let second = create(&client, NewSessionSpec::new()).await;
    let third = create(&client, NewSessionSpec::new()).await;
    client
        .close_session(&first)
        .await
        .expect("close should succeed");

    let idle = client
        .list_sessions(SessionQuery::new().with_status(SessionStatus::Idle))
        .await
        .expect("listing should succeed");
    let ids: Vec<&SessionId> = idle.iter().map(|session| &session.id).collect();
    assert_eq!(ids, vec![&third, &second]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_sessions_honours_the_limit(client: TestClient) {
    for _ in 0..3 {
        create(&client, NewSessionSpec::new()).await;
    }

    let found = client
        .list_sessions(SessionQuery::new().with_limit(2))
        .await
        .expect("listing should succeed");
    assert_eq!(found.len(), 2);
}

// ============================================================================
// Missing session tests
// ============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn get_session_returns_none_for_unknown_ids(client: TestClient) {
    let missing = SessionId::new("sess-404");
    let found = client
        .get_session(&missing)
        .await
        .expect("lookup should succeed");
    assert!(found.is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operations_on_unknown_sessions_are_typed_errors(client: TestClient) {
    let missing = SessionId::new("sess-404");

    let send = client
        .send_message(&missing, MessageRole::User, "hello".to_owned(), None)
        .await;
    assert!(matches!(send, Err(ClientError::SessionNotFound(_))));
    assert!(matches!(
        client.close_session(&missing).await,
        Err(ClientError::SessionNotFound(_))
    ));
    assert!(matches!(
        client.pause_session(&missing).await,
        Err(ClientError::SessionNotFound(_))
    ));
    assert!(matches!(
        client.get_messages(&missing, None).await,
        Err(ClientError::SessionNotFound(_))
    ));
}
