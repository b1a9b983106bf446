//! Per-request conversation context.
//!
//! Holds what tools learned during one chat request and prepares the
//! client's message history for the model.

use crate::tools::ToolResult;
use crate::types::*;
use serde_json::Value;
use tracing::debug;

/// Most recent messages kept when forwarding a long history.
pub const HISTORY_WINDOW: usize = 20;

/// One dispatched tool and how it went.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool: String,
    pub result: ToolResult,
}

/// State shared by the tool calls of a single request. Never outlives it.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    last_extraction: Option<Value>,
    outcomes: Vec<ToolOutcome>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_extraction(&self) -> Option<&Value> {
        self.last_extraction.as_ref()
    }

    pub fn outcomes(&self) -> &[ToolOutcome] {
        &self.outcomes
    }

    /// Fold a tool result in. A structured extraction replaces the previous one.
    pub fn record(&mut self, tool: &str, result: ToolResult) {
        if let ToolResult::Success {
            extraction: Some(value),
            ..
        } = &result
        {
            self.last_extraction = Some(value.clone());
        }
        self.outcomes.push(ToolOutcome {
            tool: tool.to_string(),
            result,
        });
    }
}

/// Build the message list for a streaming request.
///
/// Empty messages are dropped, the history is windowed to the most recent
/// turns, and leading assistant turns are removed because the model API
/// requires the first message to come from the user.
pub fn build_messages(previous_messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let usable: Vec<&ChatMessage> = previous_messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .collect();

    let start = usable.len().saturating_sub(HISTORY_WINDOW);
    let messages: Vec<ChatMessage> = usable[start..]
        .iter()
        .skip_while(|m| m.role == ChatRole::Assistant)
        .map(|m| (*m).clone())
        .collect();

    debug!(
        "Forwarding {} of {} messages",
        messages.len(),
        previous_messages.len()
    );
    messages
}
