//! Static catalog of the tools offered to the model.

use crate::tools::traits::{Tool, ToolDefinition};
use crate::tools::ToolError;
use std::collections::HashMap;

pub const EXTRACT_LEGAL_INFO: &str = "extract_legal_info";
pub const REVIEW_LEGAL_TEXT: &str = "review_legal_text";
pub const DRAFT_IMPROVED_LEGAL_TEXT: &str = "draft_improved_legal_text";
pub const PLAN_LEGAL_PROCESS: &str = "plan_legal_process";
pub const MISSING_CLAUSE_DETECTOR: &str = "missing_clause_detector";
pub const TODO_MANAGER: &str = "todo_manager";
pub const DEFINED_TERMS_CHECKER: &str = "defined_terms_checker";
pub const JURISDICTION_IDENTIFIER: &str = "jurisdiction_identifier";
pub const LEGAL_CITATION_VALIDATOR: &str = "legal_citation_validator";
pub const AMBIGUITY_DETECTOR: &str = "ambiguity_detector";
pub const CONFLICT_CHECKER: &str = "conflict_checker";
pub const PRECEDENT_MATCHER: &str = "precedent_matcher";
pub const LEGAL_JARGON_SIMPLIFIER: &str = "legal_jargon_simplifier";
pub const COMPLIANCE_CHECKER: &str = "compliance_checker";
pub const RISK_PHRASE_IDENTIFIER: &str = "risk_phrase_identifier";
pub const SIGNATURE_BLOCK_FORMATTER: &str = "signature_block_formatter";
pub const GOVERNING_LAW_VERIFIER: &str = "governing_law_verifier";

/// Immutable tool catalog with name lookup.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build a registry from tools in presentation order. Later duplicates
    /// of a name are ignored.
    pub fn new(tools: Vec<Tool>) -> Self {
        let mut unique = Vec::with_capacity(tools.len());
        let mut index = HashMap::with_capacity(tools.len());
        for tool in tools {
            if index.contains_key(tool.name) {
                continue;
            }
            index.insert(tool.name, unique.len());
            unique.push(tool);
        }
        Self {
            tools: unique,
            index,
        }
    }

    /// The built-in legal toolset.
    pub fn builtin() -> Self {
        Self::new(builtin_tools())
    }

    /// All tools in stable order.
    pub fn list_tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn describe(&self, name: &str) -> Result<&Tool, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(Tool::definition).collect()
    }
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

fn builtin_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            EXTRACT_LEGAL_INFO,
            "Extract parties, terms, dates and obligations from a legal text as structured JSON.",
        )
        .required_param("text", "The legal text to extract information from"),
        Tool::new(
            REVIEW_LEGAL_TEXT,
            "Review a legal text and summarize potential issues and improvements.",
        )
        .required_param("text", "The legal text to review")
        .optional_param(
            "extracted_info",
            "Previously extracted information (defaults to the latest extraction in this conversation)",
        ),
        Tool::new(
            DRAFT_IMPROVED_LEGAL_TEXT,
            "Draft an improved version of a legal text based on a review summary.",
        )
        .required_param("original_text", "The original legal text")
        .required_param("review_summary", "The review summary to address"),
        Tool::new(
            PLAN_LEGAL_PROCESS,
            "Create a step-by-step plan for a legal process.",
        )
        .required_param("process", "The legal process to plan")
        .optional_param("context", "Relevant background or constraints"),
        Tool::new(
            MISSING_CLAUSE_DETECTOR,
            "Identify standard clauses missing for the given contract type.",
        )
        .required_param("text", "The contract text to inspect")
        .required_param("contract_type", "The type of contract, e.g. lease, NDA, employment"),
        Tool::new(
            TODO_MANAGER,
            "Add, list, or remove to-do items for follow-up tasks.",
        )
        .required_param("action", "One of: add, list, remove")
        .optional_param("item", "The to-do text (required for add)")
        .optional_param("id", "The to-do id (required for remove)"),
        Tool::new(
            DEFINED_TERMS_CHECKER,
            "Ensure all defined terms are properly introduced and consistently used.",
        )
        .required_param("text", "The legal text to check for defined terms"),
        Tool::new(
            JURISDICTION_IDENTIFIER,
            "Recognize and flag jurisdiction-specific language or requirements.",
        )
        .required_param("text", "The legal text to check for jurisdiction-specific language"),
        Tool::new(
            LEGAL_CITATION_VALIDATOR,
            "Check the format and accuracy of legal citations.",
        )
        .required_param("text", "The legal text to validate citations"),
        Tool::new(
            AMBIGUITY_DETECTOR,
            "Highlight potentially ambiguous phrases or clauses.",
        )
        .required_param("text", "The legal text to check for ambiguities"),
        Tool::new(
            CONFLICT_CHECKER,
            "Identify conflicting statements within the document.",
        )
        .required_param("text", "The legal text to check for conflicts"),
        Tool::new(
            PRECEDENT_MATCHER,
            "Find similar clauses or language from a database of precedents.",
        )
        .required_param("text", "The legal text to match against precedents"),
        Tool::new(
            LEGAL_JARGON_SIMPLIFIER,
            "Suggest plain language alternatives for complex legal terms.",
        )
        .required_param("text", "The legal text to simplify"),
        Tool::new(
            COMPLIANCE_CHECKER,
            "Verify if the document meets specific regulatory requirements.",
        )
        .required_param("text", "The legal text to check for compliance")
        .required_param("regulation", "The specific regulation to check against"),
        Tool::new(
            RISK_PHRASE_IDENTIFIER,
            "Flag phrases that may increase legal risk.",
        )
        .required_param("text", "The legal text to check for risk phrases"),
        Tool::new(
            SIGNATURE_BLOCK_FORMATTER,
            "Properly format and place signature blocks.",
        )
        .required_param("text", "The legal text to format signature blocks"),
        Tool::new(
            GOVERNING_LAW_VERIFIER,
            "Ensure the governing law clause is appropriate and consistent.",
        )
        .required_param("text", "The legal text to verify governing law"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;

    #[test]
    fn builtin_catalog_has_unique_names_in_stable_order() {
        let registry = ToolRegistry::builtin();
        let names: Vec<&str> = registry.list_tools().iter().map(|t| t.name).collect();

        assert_eq!(names.len(), 17);
        assert_eq!(names[0], EXTRACT_LEGAL_INFO);
        assert_eq!(names[5], TODO_MANAGER);
        assert_eq!(names.last(), Some(&GOVERNING_LAW_VERIFIER));

        let again: Vec<&str> = ToolRegistry::builtin()
            .list_tools()
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, again);
    }

    #[test]
    fn describe_finds_tools_and_rejects_unknown_names() {
        let registry = ToolRegistry::builtin();

        let tool = registry.describe(COMPLIANCE_CHECKER).unwrap();
        assert!(tool.is_required("regulation"));

        let err = registry.describe("no_such_tool").unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::UnknownTool);
    }

    #[test]
    fn duplicate_names_keep_the_first_definition() {
        let registry = ToolRegistry::new(vec![
            Tool::new("a", "first"),
            Tool::new("b", "second"),
            Tool::new("a", "shadowed"),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.describe("a").unwrap().description, "first");
    }

    #[test]
    fn every_tool_requires_something() {
        for tool in ToolRegistry::builtin().list_tools() {
            assert!(
                !tool.input_schema.required.is_empty(),
                "{} has no required parameters",
                tool.name
            );
        }
    }
}
