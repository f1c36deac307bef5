//! End-to-end session turns against a mock Anthropic server.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use parley_core::providers::{AdapterSettings, ProviderAdapter, Role, resolve_adapter};
use parley_core::session::{Session, TurnError};
use parley_core::store::{ConversationId, ConversationMeta, ConversationStore, StorageError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds an Anthropic SSE body streaming the given chunks.
fn anthropic_sse(chunks: &[&str]) -> String {
    let mut body = String::from(
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"claude-test\",\"usage\":{\"input_tokens\":1,\"output_tokens\":1}}}\n\n\
         event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
    );
    for chunk in chunks {
        let escaped = chunk.replace('"', "\\\"");
        body.push_str(&format!(
            "event: content_block_delta\ndata: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":\"{escaped}\"}}}}\n\n"
        ));
    }
    body.push_str("event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\nevent: message_stop\ndata: {\"type\":\"message_stop\"}\n\n");
    body
}

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

fn adapter_for(server: &MockServer) -> Arc<ProviderAdapter> {
    let uri = server.uri();
    let settings = AdapterSettings {
        api_key: Some("test-key"),
        base_url: Some(&uri),
        max_tokens: None,
    };
    Arc::new(resolve_adapter("anthropic", "claude-test", settings).expect("adapter"))
}

struct MemoryStore {
    appended: Mutex<Vec<(Role, String)>>,
    fail: bool,
}

impl MemoryStore {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            appended: Mutex::new(Vec::new()),
            fail,
        })
    }

    fn appended(&self) -> Vec<(Role, String)> {
        self.appended.lock().unwrap().clone()
    }
}

impl ConversationStore for MemoryStore {
    fn create_conversation(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<ConversationMeta, StorageError> {
        Ok(ConversationMeta {
            id: ConversationId::from("conv-1"),
            provider: provider.to_string(),
            model: model.to_string(),
            created_at: chrono::Utc::now(),
        })
    }

    fn append_message(
        &self,
        _id: &ConversationId,
        role: Role,
        content: &str,
    ) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::NotFound {
                id: ConversationId::from("conv-1"),
            });
        }
        self.appended
            .lock()
            .unwrap()
            .push((role, content.to_string()));
        Ok(())
    }
}

fn session_for(server: &MockServer, store: Arc<MemoryStore>) -> Session {
    Session::new(adapter_for(server), store, ConversationId::from("conv-1"))
}

#[tokio::test]
async fn streamed_turn_accumulates_in_emission_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse_response(&anthropic_sse(&["Hel", "lo", " world"])))
        .mount(&server)
        .await;

    let store = MemoryStore::new(false);
    let mut session = session_for(&server, Arc::clone(&store));

    assert!(session.submit_user_input("greet me"));
    session.pump_until_idle().await;

    let snapshot = session.snapshot();
    assert!(!snapshot.streaming);
    assert!(snapshot.partial_reply.is_empty());
    assert_eq!(snapshot.transcript.len(), 2);
    assert_eq!(snapshot.transcript[1].content, "Hello world");
    assert_eq!(
        store.appended(),
        vec![
            (Role::User, "greet me".to_string()),
            (Role::Assistant, "Hello world".to_string()),
        ]
    );
}

#[tokio::test]
async fn vendor_error_event_aborts_the_turn() {
    let server = MockServer::start().await;
    let body = "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"m\",\"model\":\"claude-test\",\"usage\":{}}}\n\n\
                event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"busy\"}}\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let store = MemoryStore::new(false);
    let mut session = session_for(&server, Arc::clone(&store));

    assert!(session.submit_user_input("hi"));
    session.pump_until_idle().await;

    // The user message survives; no assistant entry anywhere.
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(store.appended().len(), 1);
    let err = session.snapshot().last_error.expect("error recorded");
    assert!(err.contains("overloaded_error"), "got: {err}");
}

#[tokio::test]
async fn http_status_failure_is_the_single_terminal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        ))
        .mount(&server)
        .await;

    let store = MemoryStore::new(false);
    let mut session = session_for(&server, store);

    assert!(session.submit_user_input("hi"));
    session.pump_until_idle().await;

    assert!(!session.is_streaming());
    match session.last_error() {
        Some(TurnError::Stream(err)) => {
            assert_eq!(err.message, "HTTP 401: invalid x-api-key");
        }
        other => panic!("expected stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_store_never_blocks_the_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse_response(&anthropic_sse(&["reply"])))
        .mount(&server)
        .await;

    let store = MemoryStore::new(true);
    let mut session = session_for(&server, store);

    for _ in 0..2 {
        assert!(session.submit_user_input("ask"));
        session.pump_until_idle().await;
        assert!(matches!(session.last_error(), Some(TurnError::Storage(_))));
    }

    let roles: Vec<Role> = session.transcript().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    // Still interactive after two failed persists.
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn cancellation_resolves_via_the_error_transition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            sse_response(&anthropic_sse(&["never seen"]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let store = MemoryStore::new(false);
    let mut session = session_for(&server, Arc::clone(&store));

    assert!(session.submit_user_input("hi"));
    let started = Instant::now();
    session.cancel();
    session.pump_until_idle().await;

    assert!(started.elapsed() < Duration::from_secs(5), "cancel was not prompt");
    match session.last_error() {
        Some(TurnError::Stream(err)) => assert!(err.is_canceled()),
        other => panic!("expected canceled stream error, got {other:?}"),
    }
    assert!(session.snapshot().partial_reply.is_empty());
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(store.appended().len(), 1);
}

#[tokio::test]
async fn a_turn_can_follow_a_failed_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse_response(&anthropic_sse(&["recovered"])))
        .mount(&server)
        .await;

    let store = MemoryStore::new(false);
    let mut session = session_for(&server, store);

    assert!(session.submit_user_input("first"));
    session.pump_until_idle().await;
    assert!(matches!(session.last_error(), Some(TurnError::Stream(_))));

    assert!(session.submit_user_input("second"));
    session.pump_until_idle().await;

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3); // user, user, assistant
    assert_eq!(transcript[2].content, "recovered");
}
