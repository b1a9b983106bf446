//! `todo_manager`: the only tool that does not call the model.

use crate::tools::traits::{ToolContext, ToolHandler, ToolOutput};
use crate::tools::ToolError;
use crate::types::ToolInvocation;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

pub struct TodoManager;

#[async_trait]
impl ToolHandler for TodoManager {
    async fn call(
        &self,
        invocation: &ToolInvocation,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput, ToolError> {
        let action = invocation.arg("action").unwrap_or("").trim().to_lowercase();

        let body = match action.as_str() {
            "add" => {
                let item = invocation
                    .arg("item")
                    .ok_or_else(|| ToolError::missing(&invocation.name, "item"))?;
                let id = ctx.todos.add(item).await?;
                json!({ "id": id, "item": item })
            }
            "list" => {
                let todos = ctx.todos.list().await?;
                json!({ "todos": todos })
            }
            "remove" => {
                let id = invocation
                    .arg("id")
                    .ok_or_else(|| ToolError::missing(&invocation.name, "id"))?
                    .trim();
                ctx.todos.remove(id).await?;
                json!({ "removed": id })
            }
            _ => return Err(ToolError::InvalidAction(action.clone())),
        };

        info!("todo_manager {} done", action);
        Ok(ToolOutput::text(body.to_string()))
    }
}
