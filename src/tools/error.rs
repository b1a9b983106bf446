//! Tool failure taxonomy and the normalized result folded back into the
//! conversation.

use crate::inference::ModelError;
use crate::state::StoreError;
use crate::tools::traits::ToolOutput;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Errors a tool invocation can end in. None of these escape the dispatcher.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool} requires '{field}'")]
    MissingRequiredField { tool: String, field: String },

    #[error("invalid action '{0}' (expected add, list or remove)")]
    InvalidAction(String),

    #[error("model output was not valid JSON: {reason}")]
    MalformedModelOutput { reason: String, raw: String },

    #[error("model request failed: {0}")]
    UpstreamTransport(#[from] ModelError),

    #[error("{0}")]
    Storage(#[from] StoreError),
}

impl ToolError {
    pub fn missing(tool: &str, field: &str) -> Self {
        Self::MissingRequiredField {
            tool: tool.to_string(),
            field: field.to_string(),
        }
    }

    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::UnknownTool(_) => ToolErrorKind::UnknownTool,
            Self::MissingRequiredField { .. } => ToolErrorKind::MissingRequiredField,
            Self::InvalidAction(_) => ToolErrorKind::InvalidAction,
            Self::MalformedModelOutput { .. } => ToolErrorKind::MalformedModelOutput,
            Self::UpstreamTransport(_) => ToolErrorKind::UpstreamTransportError,
            Self::Storage(_) => ToolErrorKind::StorageError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToolErrorKind {
    UnknownTool,
    MissingRequiredField,
    InvalidAction,
    MalformedModelOutput,
    UpstreamTransportError,
    StorageError,
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownTool => "UnknownTool",
            Self::MissingRequiredField => "MissingRequiredField",
            Self::InvalidAction => "InvalidAction",
            Self::MalformedModelOutput => "MalformedModelOutput",
            Self::UpstreamTransportError => "UpstreamTransportError",
            Self::StorageError => "StorageError",
        };
        f.write_str(name)
    }
}

/// Outcome of a dispatched invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        extraction: Option<Value>,
    },
    Failure {
        kind: ToolErrorKind,
        detail: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<ToolErrorKind> {
        match self {
            Self::Failure { kind, .. } => Some(*kind),
            Self::Success { .. } => None,
        }
    }

    /// String form suitable for folding back into the conversation.
    pub fn payload(&self) -> String {
        match self {
            Self::Success { output, .. } => output.clone(),
            Self::Failure { kind, detail, raw } => {
                let mut envelope = json!({ "error": kind.to_string(), "details": detail });
                if let Some(raw) = raw {
                    envelope["raw"] = Value::String(raw.clone());
                }
                envelope.to_string()
            }
        }
    }
}

impl From<ToolOutput> for ToolResult {
    fn from(output: ToolOutput) -> Self {
        Self::Success {
            output: output.text,
            extraction: output.extraction,
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        let kind = err.kind();
        let detail = err.to_string();
        let raw = match err {
            ToolError::MalformedModelOutput { raw, .. } => Some(raw),
            _ => None,
        };
        Self::Failure { kind, detail, raw }
    }
}
