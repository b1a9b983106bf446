//! Scripted model for tests and offline runs.
//!
//! Serves a fixed token script from `stream` and a queue of canned replies
//! from `complete`, recording every request it receives.

use crate::inference::{CompletionModel, CompletionRequest, ModelError, ModelResult, TokenStream};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure(String),
}

/// Deterministic in-process model.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    tokens: Vec<String>,
    refuse_stream: bool,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    complete_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens yielded, in order, by every `stream` call.
    pub fn with_stream_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Make `stream` fail before producing any token.
    pub fn refusing_stream(mut self) -> Self {
        self.refuse_stream = true;
        self
    }

    /// Queue a reply for the next `complete` call.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.lock_replies().push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a transport failure for the next `complete` call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.lock_replies().push_back(Reply::Failure(message.into()));
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Reply>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, request: CompletionRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> ModelResult<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.record(request);

        match self.lock_replies().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Failure(message)) => Err(ModelError::api(503, message)),
            None => Err(ModelError::api(500, "no scripted reply left")),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> ModelResult<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.record(request);

        if self.refuse_stream {
            return Err(ModelError::api(401, "invalid x-api-key"));
        }

        let tokens: Vec<ModelResult<String>> = self.tokens.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(tokens)))
    }
}
