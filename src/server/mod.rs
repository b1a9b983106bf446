//! HTTP surface: chat relay, health probe and tool catalog.

use crate::agent::{build_messages, build_system_prompt, relay_turn};
use crate::config::AgentConfig;
use crate::inference::{CompletionModel, CompletionRequest};
use crate::state::TodoStore;
use crate::stream::Interceptor;
use crate::tools::{Dispatcher, ToolDefinition, ToolRegistry, ToolSettings};
use crate::types::{ChatMessage, ChatRole};
use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Shared per-process state behind every handler.
pub struct AppState {
    pub config: AgentConfig,
    pub model: Arc<dyn CompletionModel>,
    pub dispatcher: Arc<Dispatcher>,
    pub system_prompt: String,
}

impl AppState {
    /// Wire the built-in toolset around a model and a to-do store.
    pub fn new(config: AgentConfig, model: Arc<dyn CompletionModel>, todos: Arc<TodoStore>) -> Self {
        let registry = Arc::new(ToolRegistry::builtin());
        let interceptor = Interceptor::new(&config.tool_sentinel, config.max_tool_call_bytes);
        let system_prompt = build_system_prompt(&registry, interceptor.sentinel());

        let settings = ToolSettings {
            model: config.tool_model.clone(),
            max_tokens: config.tool_max_tokens,
        };
        let dispatcher = Arc::new(Dispatcher::with_builtin_handlers(
            registry,
            model.clone(),
            todos,
            settings,
        ));

        Self {
            config,
            model,
            dispatcher,
            system_prompt,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

/// A client message as sent. Any role other than `user` is replayed as the
/// assistant's.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl From<IncomingMessage> for ChatMessage {
    fn from(m: IncomingMessage) -> Self {
        let role = if m.role.trim().eq_ignore_ascii_case("user") {
            ChatRole::User
        } else {
            ChatRole::Assistant
        };
        Self {
            role,
            content: m.content,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    tools: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/tools", get(tools_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn serve(state: Arc<AppState>, shutdown: CancellationToken) -> Result<()> {
    let addr = state.config.bind_address.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let history: Vec<ChatMessage> = body.messages.into_iter().map(ChatMessage::from).collect();
    let messages = build_messages(&history);
    if messages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No user message to answer" })),
        )
            .into_response();
    }

    info!("Chat request with {} messages", messages.len());
    let request = CompletionRequest::new(
        state.config.chat_model.clone(),
        messages,
        state.config.max_tokens,
    )
    .with_system(state.system_prompt.clone());

    let tokens = match state.model.stream(request).await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to open model stream: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to get AI response" })),
            )
                .into_response();
        }
    };

    let interceptor = Interceptor::new(&state.config.tool_sentinel, state.config.max_tool_call_bytes);
    let narrative = relay_turn(tokens, state.dispatcher.clone(), interceptor).map(Ok::<_, Infallible>);

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(narrative),
    )
        .into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tools: state.dispatcher.registry().len(),
    })
}

async fn tools_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ToolDefinition>> {
    Json(state.dispatcher.registry().definitions())
}
