//! Relay loop for one chat turn: Stream → Intercept → Dispatch.
//!
//! For every model token the relay:
//! 1. Feeds it to the interceptor
//! 2. Yields narrative text to the client
//! 3. Runs completed tool calls in their own task and awaits them
//! 4. Folds tool results into the request's context
//!
//! Tool results are never yielded. Dropping the returned stream drops the
//! model stream; a tool task already running finishes on its own.

use crate::agent::context::ConversationContext;
use crate::inference::TokenStream;
use crate::stream::{InterceptEvent, Interceptor};
use crate::tools::Dispatcher;
use crate::types::ToolInvocation;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Relay a model token stream to the client, dispatching tool calls inline.
pub fn relay_turn(
    tokens: TokenStream,
    dispatcher: Arc<Dispatcher>,
    interceptor: Interceptor,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let mut tokens = tokens;
        let mut interceptor = interceptor;
        let mut context = ConversationContext::new();
        let mut token_count = 0usize;

        'read: while let Some(next) = tokens.next().await {
            let token = match next {
                Ok(token) => token,
                Err(e) => {
                    error!("Model stream failed mid-response: {}", e);
                    break 'read;
                }
            };
            token_count += 1;
            debug!("Token {}: {} bytes", token_count, token.len());

            for event in interceptor.push(&token) {
                match event {
                    InterceptEvent::Narrative(text) => yield text,
                    InterceptEvent::Call(invocation) => {
                        run_tool(&dispatcher, invocation, &mut context).await;
                    }
                    InterceptEvent::Discarded { reason, bytes } => {
                        debug!("Dropped tool call ({} bytes): {:?}", bytes, reason);
                    }
                }
            }
        }

        for event in interceptor.finish() {
            if let InterceptEvent::Narrative(text) = event {
                yield text;
            }
        }

        info!(
            "Turn finished: {} tokens, {} narrative bytes, {} tool calls",
            token_count,
            interceptor.state().emitted,
            context.outcomes().len()
        );
    }
}

async fn run_tool(
    dispatcher: &Arc<Dispatcher>,
    invocation: ToolInvocation,
    context: &mut ConversationContext,
) {
    let name = invocation.name.clone();
    let extraction = context.last_extraction().cloned();
    let task_dispatcher = Arc::clone(dispatcher);

    let handle = tokio::spawn(async move {
        task_dispatcher
            .dispatch(&invocation, extraction.as_ref())
            .await
    });

    match handle.await {
        Ok(result) => {
            if result.is_success() {
                info!("Tool {} folded into context", name);
            } else {
                warn!("Tool {} failed: {}", name, result.payload());
            }
            context.record(&name, result);
        }
        Err(e) => error!("Tool task for {} did not complete: {}", name, e),
    }
}
