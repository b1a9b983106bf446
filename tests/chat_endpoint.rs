//! End-to-end tests for the HTTP surface.
//!
//! Tests cover:
//! 1. Narrative relay with a hidden to-do tool call
//! 2. HTTP 500 when the model stream cannot be opened
//! 3. JSON errors for malformed bodies, tolerant roles
//! 4. Health and tool catalog endpoints

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use legal_agent::config::AgentConfig;
use legal_agent::inference::ScriptedModel;
use legal_agent::server::{router, AppState};
use legal_agent::state::TodoStore;
use legal_agent::types::ChatMessage;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

struct TestServer {
    url: String,
    model: Arc<ScriptedModel>,
    todos: Arc<TodoStore>,
    _dir: tempfile::TempDir,
}

async fn start_test_server(model: ScriptedModel) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(model);
    let todos = Arc::new(TodoStore::open(dir.path().join("todos.json")));
    let state = Arc::new(AppState::new(
        AgentConfig::default(),
        model.clone(),
        todos.clone(),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestServer {
        url: format!("http://127.0.0.1:{}", addr.port()),
        model,
        todos,
        _dir: dir,
    }
}

async fn post_chat(server: &TestServer, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/chat", server.url))
        .json(&body)
        .send()
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_streams_narrative_and_runs_tool_calls() {
    let server = start_test_server(ScriptedModel::new().with_stream_tokens([
        "<thinking>Track it.</thinking> ",
        "[USE_TOOL]todo_manager{\"action\":\"add\",\"item\":\"Send ",
        "engagement letter\"}",
        "Added to your list.",
    ]))
    .await;

    let resp = post_chat(
        &server,
        json!({ "messages": [{ "role": "user", "content": "Remind me to send the engagement letter" }] }),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let text = resp.text().await.unwrap();
    assert_eq!(text, "<thinking>Track it.</thinking> Added to your list.");

    let items = server.todos.list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item, "Send engagement letter");

    let chat_request = &server.model.requests()[0];
    assert_eq!(chat_request.model, AgentConfig::default().chat_model);
    assert!(chat_request
        .system
        .as_deref()
        .unwrap()
        .contains("todo_manager: "));
}

#[tokio::test]
async fn stream_open_failure_is_a_500_json_error() {
    let server = start_test_server(ScriptedModel::new().refusing_stream()).await;

    let resp = post_chat(
        &server,
        json!({ "messages": [{ "role": "user", "content": "hello" }] }),
    )
    .await;

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Failed to get AI response" }));
}

#[tokio::test]
async fn empty_conversation_is_rejected() {
    let server = start_test_server(ScriptedModel::new()).await;

    let resp = post_chat(&server, json!({ "messages": [] })).await;

    assert_eq!(resp.status(), 400);
    assert_eq!(server.model.stream_calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_a_json_error() {
    let server = start_test_server(ScriptedModel::new()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chat", server.url))
        .header("content-type", "application/json")
        .body("{\"messages\": [")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = client
        .post(format!("{}/api/chat", server.url))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    assert_eq!(server.model.stream_calls(), 0);
}

#[tokio::test]
async fn non_user_roles_are_replayed_as_assistant() {
    let server = start_test_server(ScriptedModel::new().with_stream_tokens(["Sure."])).await;

    let resp = post_chat(
        &server,
        json!({ "messages": [
            { "role": "system", "content": "Be brief" },
            { "role": "user", "content": "Review clause 4" },
            { "role": "tool", "content": "Clause 4 is vague" },
            { "role": "user", "content": "And clause 5?" },
        ] }),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "Sure.");
    assert_eq!(
        server.model.requests()[0].messages,
        vec![
            ChatMessage::user("Review clause 4"),
            ChatMessage::assistant("Clause 4 is vague"),
            ChatMessage::user("And clause 5?"),
        ]
    );
}

#[tokio::test]
async fn health_and_catalog() {
    let server = start_test_server(ScriptedModel::new()).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", server.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["tools"], 17);

    let tools: Value = client
        .get(format!("{}/api/tools", server.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools[0]["name"], "extract_legal_info");
    assert_eq!(
        tools[13]["parameters"]["required"],
        json!(["text", "regulation"])
    );
}
