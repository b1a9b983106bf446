//! Prompt-backed legal analysis tools.
//!
//! Every tool here follows the same shape: build an instruction prompt from
//! the invocation, make one non-streaming model request with a tool-specific
//! system prompt and temperature, then return the reply as prose or as
//! validated JSON.

use crate::inference::CompletionRequest;
use crate::tools::registry::*;
use crate::tools::traits::{ToolContext, ToolHandler, ToolOutput};
use crate::tools::ToolError;
use crate::types::{ChatMessage, ToolInvocation};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const LEGAL_EXPERT: &str = "You are a legal expert AI assistant.";

/// How a tool's model reply is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    Prose,
    Json,
}

type PromptBuilder = fn(&ToolInvocation, &ToolContext<'_>) -> String;

/// A tool implemented as a single prompt round-trip.
pub struct PromptTool {
    name: &'static str,
    system: String,
    temperature: f32,
    format: ReplyFormat,
    shares_extraction: bool,
    build_prompt: PromptBuilder,
}

impl PromptTool {
    fn new(
        name: &'static str,
        role: &str,
        temperature: f32,
        format: ReplyFormat,
        build_prompt: PromptBuilder,
    ) -> Self {
        Self {
            name,
            system: format!("{} {}", LEGAL_EXPERT, role),
            temperature,
            format,
            shares_extraction: false,
            build_prompt,
        }
    }

    /// Hand the parsed reply back to the conversation for later tools.
    fn sharing_extraction(mut self) -> Self {
        self.shares_extraction = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl ToolHandler for PromptTool {
    async fn call(
        &self,
        invocation: &ToolInvocation,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput, ToolError> {
        let prompt = (self.build_prompt)(invocation, ctx);
        debug!("{} prompt: {} chars", self.name, prompt.len());

        let request = CompletionRequest::new(
            ctx.settings.model.clone(),
            vec![ChatMessage::user(prompt)],
            ctx.settings.max_tokens,
        )
        .with_system(self.system.clone())
        .with_temperature(self.temperature);

        let reply = ctx.model.complete(request).await?;

        match self.format {
            ReplyFormat::Prose => Ok(ToolOutput::text(reply.trim())),
            ReplyFormat::Json => {
                let value = parse_json_reply(&reply)?;
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| reply.clone());
                Ok(ToolOutput {
                    text,
                    extraction: self.shares_extraction.then_some(value),
                })
            }
        }
    }
}

/// Parse a model reply that should be JSON, tolerating a Markdown fence.
pub fn parse_json_reply(reply: &str) -> Result<Value, ToolError> {
    serde_json::from_str(strip_code_fence(reply)).map_err(|e| ToolError::MalformedModelOutput {
        reason: e.to_string(),
        raw: reply.to_string(),
    })
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn arg<'a>(invocation: &'a ToolInvocation, key: &str) -> &'a str {
    invocation.arg(key).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Prompt builders
// ---------------------------------------------------------------------------

fn extraction_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Extract key information from the following legal text and return it as a JSON \
         object with exactly this structure:\n\
         {{\n  \"parties\": [],\n  \"terms\": [],\n  \"dates\": [],\n  \"obligations\": []\n}}\n\n\
         Legal text:\n{}\n\n\
         Respond with the JSON object only.",
        arg(inv, "text")
    )
}

fn review_prompt(inv: &ToolInvocation, ctx: &ToolContext<'_>) -> String {
    let extracted = match inv.arg("extracted_info") {
        Some(explicit) => explicit.to_string(),
        None => ctx
            .last_extraction
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| "(no extracted information available)".to_string()),
    };
    format!(
        "Review the following legal text and the information extracted from it. Summarize \
         the review, including any potential issues or improvements.\n\n\
         Legal text:\n{}\n\n\
         Extracted information:\n{}\n\n\
         Provide a detailed review summary.",
        arg(inv, "text"),
        extracted
    )
}

fn draft_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Using the original legal text and the review summary, draft an improved version \
         of the legal text.\n\n\
         Original text:\n{}\n\n\
         Review summary:\n{}\n\n\
         Provide only the improved legal text.",
        arg(inv, "original_text"),
        arg(inv, "review_summary")
    )
}

fn plan_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Create a detailed plan for the following legal process, taking the context into \
         account.\n\n\
         Process: {}\n\
         Context: {}\n\n\
         Give a numbered, step-by-step plan with a short explanation for each step.",
        arg(inv, "process"),
        inv.arg("context").unwrap_or("(none given)")
    )
}

fn missing_clause_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "The following text is a {} contract. List the clauses that a contract of this \
         type normally contains but this one lacks. Return a JSON object of the form:\n\
         {{\n  \"contract_type\": \"...\",\n  \"missing_clauses\": [\n    \
         {{ \"clause\": \"...\", \"importance\": \"high|medium|low\", \"reason\": \"...\" }}\n  ]\n}}\n\n\
         Contract text:\n{}\n\n\
         Respond with the JSON object only.",
        arg(inv, "contract_type"),
        arg(inv, "text")
    )
}

fn defined_terms_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Check the defined terms in the following legal text. For each defined term, state \
         where it is introduced and flag terms that are used before definition, defined but \
         never used, capitalized inconsistently, or used with a different meaning.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn jurisdiction_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Identify any jurisdiction-specific language or requirements in the following legal \
         text. Name the jurisdiction each one points to and explain what it requires.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn citation_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Validate every legal citation in the following text. Return a JSON object of the \
         form:\n\
         {{\n  \"citations\": [\n    {{ \"citation\": \"...\", \"valid_format\": true, \
         \"issues\": [], \"suggested\": \"...\" }}\n  ]\n}}\n\n\
         Legal text:\n{}\n\n\
         Respond with the JSON object only.",
        arg(inv, "text")
    )
}

fn ambiguity_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Highlight potentially ambiguous phrases or clauses in the following legal text. \
         Quote each one, explain the competing readings, and suggest clearer wording.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn conflict_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Identify statements in the following document that conflict with each other. \
         For each conflict, quote both provisions and explain how they clash.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn precedent_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Find clauses or language in well-known precedents and standard forms that resemble \
         the following legal text. Describe each match and how it differs.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn jargon_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Suggest plain language alternatives for the complex legal terms in the following \
         text. List each term with its plain replacement, then give a plain language \
         rewrite of the passage.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn compliance_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Check whether the following document meets the requirements of {}. List each \
         relevant requirement, whether it is satisfied, and what is missing.\n\n\
         Legal text:\n{}",
        arg(inv, "regulation"),
        arg(inv, "text")
    )
}

fn risk_phrase_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Flag phrases in the following legal text that may increase legal risk. Return a \
         JSON object of the form:\n\
         {{\n  \"risks\": [\n    {{ \"phrase\": \"...\", \"severity\": \"high|medium|low\", \
         \"explanation\": \"...\", \"alternative\": \"...\" }}\n  ]\n}}\n\n\
         Legal text:\n{}\n\n\
         Respond with the JSON object only.",
        arg(inv, "text")
    )
}

fn signature_block_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Format the signature blocks for the following legal text. Include a block for each \
         party with name, title, and date lines, placed where they belong.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

fn governing_law_prompt(inv: &ToolInvocation, _: &ToolContext<'_>) -> String {
    format!(
        "Verify the governing law clause of the following legal text. Check that it exists, \
         is appropriate for the parties and subject matter, and is consistent with any venue \
         or dispute resolution provisions.\n\n\
         Legal text:\n{}",
        arg(inv, "text")
    )
}

/// Every prompt-backed tool, one per legal catalog entry.
pub fn prompt_tools() -> Vec<PromptTool> {
    use ReplyFormat::{Json, Prose};

    vec![
        PromptTool::new(
            EXTRACT_LEGAL_INFO,
            "Extract key information from legal texts and return it as a structured JSON object.",
            0.0,
            Json,
            extraction_prompt,
        )
        .sharing_extraction(),
        PromptTool::new(
            REVIEW_LEGAL_TEXT,
            "Review legal texts and provide detailed summaries and suggestions for improvement.",
            0.2,
            Prose,
            review_prompt,
        ),
        PromptTool::new(
            DRAFT_IMPROVED_LEGAL_TEXT,
            "Draft improved versions of legal texts based on reviews and suggestions.",
            0.3,
            Prose,
            draft_prompt,
        ),
        PromptTool::new(
            PLAN_LEGAL_PROCESS,
            "Create detailed plans for legal processes based on given contexts.",
            0.2,
            Prose,
            plan_prompt,
        ),
        PromptTool::new(
            MISSING_CLAUSE_DETECTOR,
            "Identify standard clauses missing from contracts and answer in JSON.",
            0.1,
            Json,
            missing_clause_prompt,
        ),
        PromptTool::new(
            DEFINED_TERMS_CHECKER,
            "Audit how defined terms are introduced and used in legal documents.",
            0.1,
            Prose,
            defined_terms_prompt,
        ),
        PromptTool::new(
            JURISDICTION_IDENTIFIER,
            "Recognize jurisdiction-specific language and requirements.",
            0.1,
            Prose,
            jurisdiction_prompt,
        ),
        PromptTool::new(
            LEGAL_CITATION_VALIDATOR,
            "Validate the format and accuracy of legal citations and answer in JSON.",
            0.0,
            Json,
            citation_prompt,
        ),
        PromptTool::new(
            AMBIGUITY_DETECTOR,
            "Find ambiguous phrasing in legal documents.",
            0.2,
            Prose,
            ambiguity_prompt,
        ),
        PromptTool::new(
            CONFLICT_CHECKER,
            "Find internally inconsistent provisions in legal documents.",
            0.1,
            Prose,
            conflict_prompt,
        ),
        PromptTool::new(
            PRECEDENT_MATCHER,
            "Relate contract language to established precedents and standard forms.",
            0.3,
            Prose,
            precedent_prompt,
        ),
        PromptTool::new(
            LEGAL_JARGON_SIMPLIFIER,
            "Rewrite legal jargon in plain language without changing its meaning.",
            0.3,
            Prose,
            jargon_prompt,
        ),
        PromptTool::new(
            COMPLIANCE_CHECKER,
            "Check documents against specific regulatory requirements.",
            0.1,
            Prose,
            compliance_prompt,
        ),
        PromptTool::new(
            RISK_PHRASE_IDENTIFIER,
            "Flag risky contract language and answer in JSON.",
            0.1,
            Json,
            risk_phrase_prompt,
        ),
        PromptTool::new(
            SIGNATURE_BLOCK_FORMATTER,
            "Format signature blocks for legal documents.",
            0.1,
            Prose,
            signature_block_prompt,
        ),
        PromptTool::new(
            GOVERNING_LAW_VERIFIER,
            "Verify governing law clauses for appropriateness and consistency.",
            0.1,
            Prose,
            governing_law_prompt,
        ),
    ]
}
