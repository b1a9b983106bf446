//! Model inference via the Anthropic Messages API.
//!
//! Streaming responses arrive as Server-Sent Events; only `text_delta`
//! content is surfaced as tokens.

use crate::config::AgentConfig;
use crate::inference::{CompletionModel, CompletionRequest, ModelError, ModelResult, TokenStream};
use crate::types::ChatMessage;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
}

// -- Messages API request/response types --------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta {
        delta: Delta,
    },
    MessageStop,
    Error {
        error: ErrorBody,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

/// What a single SSE frame means for the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseFrame {
    Token(String),
    Stop,
    Error(String),
    Skip,
}

impl AnthropicClient {
    /// Create a new client. Fails when no API key is available.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> ModelResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
            http,
        })
    }

    /// Create a client from the runtime configuration.
    pub fn from_config(config: &AgentConfig) -> ModelResult<Self> {
        Self::new(
            &config.api_url,
            &config.api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> ModelResult<reqwest::Response> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
            system: request.system.as_deref(),
            temperature: request.temperature,
            stream,
        };

        debug!(
            "Model request to {} ({} messages, stream: {})",
            request.model,
            request.messages.len(),
            stream
        );

        let mut builder = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        // A stream may outlive the request timeout; `sse_tokens` bounds idle gaps instead.
        if !stream {
            builder = builder.timeout(self.timeout);
        }

        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ModelError::RateLimited(text));
            }
            return Err(ModelError::api(status.as_u16(), text));
        }

        Ok(resp)
    }
}

#[async_trait]
impl CompletionModel for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> ModelResult<String> {
        let resp = self.send(&request, false).await?;
        let body: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        let text: String = body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ModelError::Decode("response contained no text content".into()));
        }
        Ok(text)
    }

    async fn stream(&self, request: CompletionRequest) -> ModelResult<TokenStream> {
        let resp = self.send(&request, true).await?;
        Ok(sse_tokens(resp.bytes_stream(), self.timeout))
    }
}

/// Turn an SSE byte stream into text tokens. A gap longer than `idle`
/// between chunks ends the stream with [`ModelError::Stream`].
pub(crate) fn sse_tokens<S, B>(bytes: S, idle: Duration) -> TokenStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let mut bytes = Box::pin(bytes);

    Box::pin(async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();

        'read: loop {
            let chunk = match tokio::time::timeout(idle, bytes.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    yield Err(ModelError::Http(e));
                    break 'read;
                }
                Ok(None) => break 'read,
                Err(_) => {
                    warn!("Model stream idle for {:?}, giving up", idle);
                    yield Err(ModelError::Stream(format!("no data for {:?}", idle)));
                    break 'read;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(frame) = take_sse_frame(&mut buffer) {
                match decode_sse_frame(&frame) {
                    SseFrame::Token(text) => yield Ok(text),
                    SseFrame::Stop => break 'read,
                    SseFrame::Error(message) => {
                        yield Err(ModelError::Stream(message));
                        break 'read;
                    }
                    SseFrame::Skip => {}
                }
            }
        }
    })
}

/// Split the next complete SSE frame (terminated by a blank line) off the
/// front of the byte buffer. Works on bytes so multi-byte characters split
/// across network chunks are reassembled before decoding.
pub(crate) fn take_sse_frame(buffer: &mut Vec<u8>) -> Option<String> {
    let (end, sep_len) = find_frame_end(buffer)?;
    let frame = String::from_utf8_lossy(&buffer[..end]).into_owned();
    buffer.drain(..end + sep_len);
    Some(frame)
}

fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Interpret one SSE frame from the Messages API.
pub(crate) fn decode_sse_frame(frame: &str) -> SseFrame {
    let Some(data) = frame
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
    else {
        return SseFrame::Skip;
    };

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        }) => SseFrame::Token(text),
        Ok(StreamEvent::MessageStop) => SseFrame::Stop,
        Ok(StreamEvent::Error { error }) => SseFrame::Error(format!("{}: {}", error.kind, error.message)),
        Ok(_) => SseFrame::Skip,
        Err(e) => {
            warn!("Ignoring undecodable stream event: {}", e);
            SseFrame::Skip
        }
    }
}
