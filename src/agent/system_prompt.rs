//! Layered system prompt builder.
//!
//! Layers (in order):
//! 1. Role
//! 2. Tool catalog, rendered from the registry
//! 3. Tool-call wire convention
//! 4. Reasoning and planning instructions
//! 5. Tool-specific hints

use crate::tools::registry::{MISSING_CLAUSE_DETECTOR, TODO_MANAGER};
use crate::tools::ToolRegistry;
use tracing::debug;

const ROLE: &str = "You are an AI assistant capable of analyzing legal texts and performing \
various legal tasks.";

const REASONING: &str = r#"
# How to work

Before using a tool or giving a response, explain your thought process inside <thinking> tags. For example:

<thinking>
I need the parties and obligations from this contract before I can review it, so I will extract them first.
</thinking>

Before using any tools, think through a plan and outline which tools you will need. The plan should be a numbered list of up to 10 steps:

1. Step 1
2. Step 2
3. Step 3

Use one tool at a time. After each tool use, ask the user whether to continue, stop, or proceed differently.

Always use <thinking> tags to show your reasoning before taking any action or giving a response.
"#;

/// Build the system prompt for a chat request.
pub fn build_system_prompt(registry: &ToolRegistry, sentinel: &str) -> String {
    let mut prompt = String::with_capacity(4096);

    // Layer 1: Role
    prompt.push_str(ROLE);
    prompt.push_str(" You have access to the following tools:\n\n");

    // Layer 2: Tool catalog
    for tool in registry.list_tools() {
        prompt.push_str(&format!("{}: {}\n", tool.name, tool.description));
        for param in &tool.input_schema.properties {
            let need = if tool.is_required(param.name) {
                "required"
            } else {
                "optional"
            };
            prompt.push_str(&format!(
                "  - {} ({}, {}): {}\n",
                param.name, param.kind, need, param.description
            ));
        }
    }

    // Layer 3: Wire convention
    prompt.push_str("\n# Using tools\n\n");
    prompt.push_str(&format!(
        "To use a tool, write {sentinel} immediately followed by the tool name and a JSON \
         object of its parameters, all string valued, for example:\n\n\
         {sentinel}review_legal_text{{\"text\":\"The Tenant shall pay rent monthly.\"}}\n\n\
         Write nothing else on that line. The tool runs privately; its output is not shown \
         to the user, so summarize what you learned in your own words.\n"
    ));

    // Layer 4: Reasoning
    prompt.push_str(REASONING);

    // Layer 5: Hints, only for tools that are actually offered
    if registry.describe(MISSING_CLAUSE_DETECTOR).is_ok() {
        prompt.push_str(
            "\nWhen using missing_clause_detector, set contract_type from the context of the \
             document being analyzed.\n",
        );
    }
    if registry.describe(TODO_MANAGER).is_ok() {
        prompt.push_str(
            "\nUse todo_manager to keep track of tasks or follow-up items that come up during \
             the conversation: action \"add\" with an item, \"list\", or \"remove\" with an id.\n",
        );
    }

    debug!("System prompt: {} chars", prompt.len());
    prompt
}
