//! Shared types used across the legal agent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A chat message in the multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The model API only accepts user and assistant turns; the system prompt
/// travels separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// Parameter values supplied to a tool, keyed by parameter name.
pub type ToolInput = BTreeMap<String, String>;

/// A request to run one tool, parsed out of the model's token stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub input: ToolInput,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, input: ToolInput) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }

    /// Build an invocation from a tool name and a raw JSON object literal.
    ///
    /// Strings are taken verbatim, other scalars are stringified, `null` is
    /// treated as absent and nested values keep their compact JSON text.
    pub fn from_json(name: &str, raw: &str) -> Result<Self, serde_json::Error> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let input = object
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((key, text))
            })
            .collect();
        Ok(Self::new(name, input))
    }

    /// Look up a parameter, treating blank strings as absent.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.input
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// To-do list
// ---------------------------------------------------------------------------

/// A persisted to-do record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub item: String,
}
