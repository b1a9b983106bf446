//! Tool descriptors and the handler interface.

use crate::inference::CompletionModel;
use crate::state::TodoStore;
use crate::tools::ToolError;
use crate::types::{ToolInput, ToolInvocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Definition of a tool as exposed over the catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
}

/// Ordered parameters plus the subset that must be supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    pub properties: Vec<ParamSpec>,
    pub required: Vec<&'static str>,
}

/// Static tool descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: InputSchema,
}

impl Tool {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            input_schema: InputSchema::default(),
        }
    }

    pub fn required_param(mut self, name: &'static str, description: &'static str) -> Self {
        self.input_schema.required.push(name);
        self.optional_param(name, description)
    }

    pub fn optional_param(mut self, name: &'static str, description: &'static str) -> Self {
        self.input_schema.properties.push(ParamSpec {
            name,
            kind: "string",
            description,
        });
        self
    }

    pub fn is_required(&self, param: &str) -> bool {
        self.input_schema.required.contains(&param)
    }

    /// First required parameter that is absent or blank in `input`.
    pub fn missing_required(&self, input: &ToolInput) -> Option<&'static str> {
        self.input_schema
            .required
            .iter()
            .copied()
            .find(|name| input.get(*name).map_or(true, |v| v.trim().is_empty()))
    }

    /// JSON Schema for the tool's parameters.
    pub fn parameters_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .input_schema
            .properties
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": p.kind, "description": p.description }),
                )
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.input_schema.required,
        })
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Model settings shared by every handler's one-shot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub model: String,
    pub max_tokens: u32,
}

/// Everything a handler may touch while running one invocation.
pub struct ToolContext<'a> {
    pub model: &'a dyn CompletionModel,
    pub settings: &'a ToolSettings,
    pub todos: &'a TodoStore,
    /// Structured extraction produced earlier in the same conversation.
    pub last_extraction: Option<&'a Value>,
}

/// Successful handler output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    /// Set only by tools whose result later tools may consume.
    pub extraction: Option<Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extraction: None,
        }
    }
}

/// Implements exactly one tool's semantics.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        invocation: &ToolInvocation,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compliance() -> Tool {
        Tool::new("compliance_checker", "Verify regulatory requirements.")
            .required_param("text", "The legal text")
            .required_param("regulation", "The regulation")
            .optional_param("notes", "Anything else")
    }

    #[test]
    fn missing_required_reports_first_absent_field() {
        let tool = compliance();
        let mut input = ToolInput::new();
        assert_eq!(tool.missing_required(&input), Some("text"));

        input.insert("text".into(), "Clause 1".into());
        assert_eq!(tool.missing_required(&input), Some("regulation"));

        input.insert("regulation".into(), " ".into());
        assert_eq!(tool.missing_required(&input), Some("regulation"));

        input.insert("regulation".into(), "GDPR".into());
        assert_eq!(tool.missing_required(&input), None);
    }

    #[test]
    fn schema_lists_properties_and_required() {
        let schema = compliance().parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["regulation"]["type"], "string");
        assert_eq!(schema["required"], json!(["text", "regulation"]));
        assert!(schema["properties"].get("notes").is_some());
    }
}
