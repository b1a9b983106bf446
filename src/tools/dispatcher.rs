//! Routes parsed tool invocations to their handlers.
//!
//! Dispatch never fails: every error becomes a [`ToolResult::Failure`] that
//! the caller folds back into the conversation.

use crate::inference::CompletionModel;
use crate::state::TodoStore;
use crate::tools::legal;
use crate::tools::registry::{ToolRegistry, TODO_MANAGER};
use crate::tools::todo::TodoManager;
use crate::tools::traits::{ToolContext, ToolHandler, ToolSettings};
use crate::tools::{ToolError, ToolResult};
use crate::types::ToolInvocation;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
    model: Arc<dyn CompletionModel>,
    todos: Arc<TodoStore>,
    settings: ToolSettings,
}

impl Dispatcher {
    /// A dispatcher with no handlers registered.
    pub fn new(
        registry: Arc<ToolRegistry>,
        model: Arc<dyn CompletionModel>,
        todos: Arc<TodoStore>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            model,
            todos,
            settings,
        }
    }

    /// A dispatcher wired with every built-in handler.
    pub fn with_builtin_handlers(
        registry: Arc<ToolRegistry>,
        model: Arc<dyn CompletionModel>,
        todos: Arc<TodoStore>,
        settings: ToolSettings,
    ) -> Self {
        let mut dispatcher = Self::new(registry, model, todos, settings);
        for tool in legal::prompt_tools() {
            dispatcher.register(tool.name(), Arc::new(tool));
        }
        dispatcher.register(TODO_MANAGER, Arc::new(TodoManager));
        dispatcher
    }

    pub fn register(&mut self, name: &'static str, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name, handler);
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one invocation. `last_extraction` is the most recent structured
    /// extraction in the caller's conversation, if any.
    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        last_extraction: Option<&Value>,
    ) -> ToolResult {
        let result = match self.run(invocation, last_extraction).await {
            Ok(output) => ToolResult::from(output),
            Err(e) => {
                warn!("Tool {} failed: {}", invocation.name, e);
                ToolResult::from(e)
            }
        };

        if let ToolResult::Success { output, .. } = &result {
            info!("Tool {} returned {} chars", invocation.name, output.len());
        }
        result
    }

    async fn run(
        &self,
        invocation: &ToolInvocation,
        last_extraction: Option<&Value>,
    ) -> Result<crate::tools::ToolOutput, ToolError> {
        let tool = self.registry.describe(&invocation.name)?;

        if let Some(field) = tool.missing_required(&invocation.input) {
            return Err(ToolError::missing(tool.name, field));
        }

        let handler = self
            .handlers
            .get(tool.name)
            .ok_or_else(|| ToolError::UnknownTool(invocation.name.clone()))?;

        info!("Dispatching tool {}", tool.name);
        let ctx = ToolContext {
            model: self.model.as_ref(),
            settings: &self.settings,
            todos: &self.todos,
            last_extraction,
        };
        handler.call(invocation, &ctx).await
    }
}
