//! Model inference: the completion interface the proxy and tools call into.

pub mod anthropic;
pub mod error;
pub mod scripted;

pub use anthropic::AnthropicClient;
pub use error::{ModelError, ModelResult};
pub use scripted::ScriptedModel;

use crate::types::ChatMessage;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Incremental text tokens from a streaming completion, ending with the stream.
pub type TokenStream = Pin<Box<dyn Stream<Item = ModelResult<String>> + Send>>;

/// One request to the model, streamed or not.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A hosted model that can answer in one piece or token by token.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Issue a non-streaming request and return the full reply text.
    async fn complete(&self, request: CompletionRequest) -> ModelResult<String>;

    /// Open a streaming request. Failing here means no token was produced.
    async fn stream(&self, request: CompletionRequest) -> ModelResult<TokenStream>;
}
