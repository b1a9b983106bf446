//! Configuration schema for legal-agent.toml.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model API base URL.
    pub api_url: String,

    /// Model API key. `ANTHROPIC_API_KEY` takes precedence when set.
    pub api_key: String,

    /// Model used for the streamed conversation.
    pub chat_model: String,

    /// Model used by tool handlers for their one-shot requests.
    pub tool_model: String,

    /// Token budget for the streamed conversation.
    pub max_tokens: u32,

    /// Token budget for each tool handler request.
    pub tool_max_tokens: u32,

    /// Address the HTTP server binds to.
    pub bind_address: String,

    /// JSON file backing the to-do list.
    pub todo_path: String,

    /// Literal text that opens an in-band tool call.
    pub tool_sentinel: String,

    /// Upper bound on a buffered tool call before it is dropped.
    pub max_tool_call_bytes: usize,

    /// Timeout for each model API request.
    pub request_timeout_secs: u64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".into(),
            api_key: String::new(),
            chat_model: "claude-3-opus-20240229".into(),
            tool_model: "claude-3-5-sonnet-20240620".into(),
            max_tokens: 1000,
            tool_max_tokens: 4000,
            bind_address: "127.0.0.1:3000".into(),
            todo_path: "~/.legal-agent/todos.json".into(),
            tool_sentinel: "[USE_TOOL]".into(),
            max_tool_call_bytes: 64 * 1024,
            request_timeout_secs: 120,
            log_level: "info".into(),
        }
    }
}

impl AgentConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved to-do file path.
    pub fn resolved_todo_path(&self) -> String {
        self.resolve_path(&self.todo_path)
    }

    /// Replace the configured key with one from the environment, if present.
    pub fn apply_api_key_override(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = key;
        }
    }
}
