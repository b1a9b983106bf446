//! Tool-call interception over a model token stream.
//!
//! The model requests a tool in-band by writing a sentinel, a tool name and
//! a JSON object: `[USE_TOOL]review_legal_text{"text":"..."}`. The
//! interceptor forwards everything else as narrative, buffers the call until
//! its braces balance, then hands back a parsed [`ToolInvocation`].
//!
//! It is synchronous and allocation-light so the async relay can drive it
//! token by token.

use crate::types::ToolInvocation;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const DEFAULT_SENTINEL: &str = "[USE_TOOL]";

/// `name{...}` once the sentinel has been stripped.
static CALL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(\w+)\s*(\{.*\})\s*$").expect("call pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Passthrough,
    Buffering,
}

/// Per-request scanner state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub mode: Mode,
    /// Raw call text since the sentinel, sentinel included.
    pub buffer: String,
    /// Bytes of narrative forwarded so far.
    pub emitted: usize,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            mode: Mode::Passthrough,
            buffer: String::new(),
            emitted: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Braces balanced but the text was not `name{json object}`.
    Malformed(String),
    /// The call outgrew the buffer limit.
    Overflow,
    /// The stream ended mid-call.
    Unterminated,
}

/// What the relay should do with a piece of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptEvent {
    Narrative(String),
    Call(ToolInvocation),
    Discarded { reason: DiscardReason, bytes: usize },
}

/// Incremental brace-depth counter for one JSON object.
///
/// Nothing counts until the first `{`. Braces inside string literals are
/// ignored, and backslash escapes inside strings are honored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BraceCounter {
    depth: usize,
    started: bool,
    in_string: bool,
    escaped: bool,
}

impl BraceCounter {
    /// Feed one character. Returns true when it closes the outermost object.
    pub fn feed(&mut self, c: char) -> bool {
        if !self.started {
            if c == '{' {
                self.started = true;
                self.depth = 1;
            }
            return false;
        }
        if self.depth == 0 {
            return false;
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return false;
        }

        match c {
            '"' => self.in_string = true,
            '{' => self.depth += 1,
            '}' => {
                self.depth -= 1;
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Length of the longest proper prefix of `sentinel` that `text` ends with.
pub fn partial_sentinel_len(text: &str, sentinel: &str) -> usize {
    let longest = text.len().min(sentinel.len().saturating_sub(1));
    (1..=longest)
        .rev()
        .find(|&k| sentinel.is_char_boundary(k) && text.ends_with(&sentinel[..k]))
        .unwrap_or(0)
}

/// PASSTHROUGH/BUFFERING state machine.
#[derive(Debug, Clone)]
pub struct Interceptor {
    sentinel: String,
    max_call_bytes: usize,
    state: StreamState,
    braces: BraceCounter,
    // Token tail that might be the start of a sentinel.
    holdback: String,
    // Over the limit: skip to the end of the call without storing it.
    discarding: bool,
}

impl Interceptor {
    pub fn new(sentinel: &str, max_call_bytes: usize) -> Self {
        let sentinel = if sentinel.trim().is_empty() {
            warn!("Empty tool sentinel configured, using {}", DEFAULT_SENTINEL);
            DEFAULT_SENTINEL
        } else {
            sentinel
        };

        Self {
            sentinel: sentinel.to_string(),
            max_call_bytes,
            state: StreamState::default(),
            braces: BraceCounter::default(),
            holdback: String::new(),
            discarding: false,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Consume one token.
    pub fn push(&mut self, token: &str) -> Vec<InterceptEvent> {
        let mut events = Vec::new();
        let mut input = std::mem::take(&mut self.holdback);
        input.push_str(token);

        let mut rest = input.as_str();
        while !rest.is_empty() {
            rest = match self.state.mode {
                Mode::Passthrough => self.scan_narrative(rest, &mut events),
                Mode::Buffering => self.scan_call(rest, &mut events),
            };
        }
        events
    }

    /// End of stream: flush held-back text, drop any unfinished call.
    pub fn finish(&mut self) -> Vec<InterceptEvent> {
        let mut events = Vec::new();
        match self.state.mode {
            Mode::Passthrough => {
                let tail = std::mem::take(&mut self.holdback);
                self.narrative(tail, &mut events);
            }
            Mode::Buffering => {
                if !self.discarding {
                    let bytes = self.state.buffer.len();
                    warn!("Stream ended inside a tool call, discarding {} bytes", bytes);
                    events.push(InterceptEvent::Discarded {
                        reason: DiscardReason::Unterminated,
                        bytes,
                    });
                }
                self.reset_call();
            }
        }
        events
    }

    fn scan_narrative<'a>(&mut self, text: &'a str, events: &mut Vec<InterceptEvent>) -> &'a str {
        if let Some(pos) = text.find(self.sentinel.as_str()) {
            self.narrative(text[..pos].to_string(), events);
            self.state.mode = Mode::Buffering;
            self.state.buffer.push_str(&self.sentinel);
            debug!("Tool sentinel seen after {} narrative bytes", self.state.emitted);
            return &text[pos + self.sentinel.len()..];
        }

        let split = text.len() - partial_sentinel_len(text, &self.sentinel);
        self.narrative(text[..split].to_string(), events);
        self.holdback.push_str(&text[split..]);
        ""
    }

    fn scan_call<'a>(&mut self, text: &'a str, events: &mut Vec<InterceptEvent>) -> &'a str {
        let mut end = None;
        for (i, c) in text.char_indices() {
            if self.braces.feed(c) {
                end = Some(i + c.len_utf8());
                break;
            }
        }
        let consumed = end.unwrap_or(text.len());
        let (chunk, rest) = text.split_at(consumed);

        if !self.discarding {
            let bytes = self.state.buffer.len() + chunk.len();
            if bytes > self.max_call_bytes {
                warn!(
                    "Tool call exceeded {} bytes, discarding",
                    self.max_call_bytes
                );
                events.push(InterceptEvent::Discarded {
                    reason: DiscardReason::Overflow,
                    bytes,
                });
                self.state.buffer.clear();
                if !self.braces.started() {
                    // No argument object yet, so nothing left to skip.
                    self.reset_call();
                    return rest;
                }
                self.discarding = true;
            } else {
                self.state.buffer.push_str(chunk);
            }
        }

        if end.is_some() {
            if !self.discarding {
                events.push(self.complete_call());
            }
            self.reset_call();
        }
        rest
    }

    fn complete_call(&self) -> InterceptEvent {
        let raw = &self.state.buffer;
        let body = raw.strip_prefix(self.sentinel.as_str()).unwrap_or(raw);

        let parsed = CALL_PATTERN
            .captures(body)
            .ok_or_else(|| "expected a tool name followed by a JSON object".to_string())
            .and_then(|caps| {
                ToolInvocation::from_json(&caps[1], &caps[2]).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(invocation) => {
                debug!("Parsed tool call {} ({} bytes)", invocation.name, raw.len());
                InterceptEvent::Call(invocation)
            }
            Err(reason) => {
                warn!("Malformed tool call discarded: {}", reason);
                InterceptEvent::Discarded {
                    reason: DiscardReason::Malformed(reason),
                    bytes: raw.len(),
                }
            }
        }
    }

    fn narrative(&mut self, text: String, events: &mut Vec<InterceptEvent>) {
        if text.is_empty() {
            return;
        }
        self.state.emitted += text.len();
        events.push(InterceptEvent::Narrative(text));
    }

    fn reset_call(&mut self) {
        self.state.mode = Mode::Passthrough;
        self.state.buffer.clear();
        self.braces = BraceCounter::default();
        self.discarding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 64 * 1024;

    fn run(tokens: &[&str]) -> Vec<InterceptEvent> {
        run_with(Interceptor::new(DEFAULT_SENTINEL, LIMIT), tokens)
    }

    fn run_with(mut interceptor: Interceptor, tokens: &[&str]) -> Vec<InterceptEvent> {
        let mut events = Vec::new();
        for token in tokens {
            events.extend(interceptor.push(token));
        }
        events.extend(interceptor.finish());
        events
    }

    fn narrative(events: &[InterceptEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                InterceptEvent::Narrative(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn calls(events: &[InterceptEvent]) -> Vec<&ToolInvocation> {
        events
            .iter()
            .filter_map(|e| match e {
                InterceptEvent::Call(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let tokens = ["Under ", "clause [4] the ", "tenant {may} ", "sublet."];
        let events = run(&tokens);

        assert_eq!(narrative(&events), tokens.concat());
        assert!(calls(&events).is_empty());
    }

    #[test]
    fn whole_call_in_one_token() {
        let events = run(&[
            r#"Let me check. [USE_TOOL]ambiguity_detector{"text":"best efforts"} Done."#,
        ]);

        assert_eq!(narrative(&events), "Let me check.  Done.");
        let calls = calls(&events);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "ambiguity_detector");
        assert_eq!(calls[0].arg("text"), Some("best efforts"));
    }

    #[test]
    fn sentinel_split_across_tokens_is_never_forwarded() {
        let events = run(&["Checking [US", "E_TO", "OL]todo_manager{\"action\":\"list\"}", " ok"]);

        let text = narrative(&events);
        assert_eq!(text, "Checking  ok");
        assert!(!text.contains('['));
        assert_eq!(calls(&events).len(), 1);
    }

    #[test]
    fn call_split_at_every_byte_boundary_dispatches_once() {
        let full = r#"Before [USE_TOOL]compliance_checker {"text":"a {b} \"c\"","regulation":"GDPR"} after"#;

        for split in 1..full.len() {
            if !full.is_char_boundary(split) {
                continue;
            }
            let events = run(&[&full[..split], &full[split..]]);
            let found = calls(&events);
            assert_eq!(found.len(), 1, "split at {split}");
            assert_eq!(found[0].arg("text"), Some("a {b} \"c\""));
            assert_eq!(found[0].arg("regulation"), Some("GDPR"));
            assert_eq!(narrative(&events), "Before  after", "split at {split}");
        }
    }

    #[test]
    fn char_by_char_stream_matches_single_token() {
        let full = "Intro [USE_TOOL]plan_legal_process{\"process\":\"merger\",\"context\":\"EU\"} outro";
        let chars: Vec<String> = full.chars().map(String::from).collect();
        let tokens: Vec<&str> = chars.iter().map(String::as_str).collect();

        let split = run(&tokens);
        let whole = run(&[full]);
        assert_eq!(narrative(&split), narrative(&whole));
        assert_eq!(calls(&split), calls(&whole));
        assert_eq!(calls(&whole).len(), 1);
    }

    #[test]
    fn truncated_call_dispatches_nothing() {
        let events = run(&["Sure. [USE_TOOL]review_legal_text{\"text\":\"The lessee sh"]);

        assert_eq!(narrative(&events), "Sure. ");
        assert!(calls(&events).is_empty());
        assert!(matches!(
            events.last(),
            Some(InterceptEvent::Discarded {
                reason: DiscardReason::Unterminated,
                ..
            })
        ));
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_call() {
        let events = run(&[
            r#"[USE_TOOL]conflict_checker{"text":"see } and \\\"{ here"}"#,
            " tail",
        ]);

        let found = calls(&events);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].arg("text"), Some("see } and \\\"{ here"));
        assert_eq!(narrative(&events), " tail");
    }

    #[test]
    fn second_sentinel_while_buffering_is_plain_text() {
        let events = run(&[r#"[USE_TOOL]ambiguity_detector{"text":"x [USE_TOOL] y"}"#]);

        let found = calls(&events);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].arg("text"), Some("x [USE_TOOL] y"));
    }

    #[test]
    fn two_calls_in_sequence() {
        let events = run(&[
            "A [USE_TOOL]extract_legal_info{\"text\":\"t\"}",
            " B [USE_TOOL]review_legal_text{\"text\":\"t\"} C",
        ]);

        let names: Vec<&str> = calls(&events).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["extract_legal_info", "review_legal_text"]);
        assert_eq!(narrative(&events), "A  B  C");
    }

    #[test]
    fn malformed_call_is_discarded_and_narrative_resumes() {
        let events = run(&["x [USE_TOOL]not a name {\"a\":1} y"]);

        assert!(calls(&events).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            InterceptEvent::Discarded {
                reason: DiscardReason::Malformed(_),
                ..
            }
        )));
        assert_eq!(narrative(&events), "x  y");
    }

    #[test]
    fn invalid_json_object_is_malformed() {
        let events = run(&["[USE_TOOL]ambiguity_detector{text: unquoted}"]);
        assert!(calls(&events).is_empty());
        assert!(matches!(
            events.first(),
            Some(InterceptEvent::Discarded {
                reason: DiscardReason::Malformed(_),
                ..
            })
        ));
    }

    #[test]
    fn overflow_discards_the_call_and_skips_its_arguments() {
        let interceptor = Interceptor::new(DEFAULT_SENTINEL, 40);
        let long = "z".repeat(100);
        let events = run_with(
            interceptor,
            &[
                "Hi [USE_TOOL]ambiguity_detector{\"text\":\"",
                long.as_str(),
                "\"} bye",
            ],
        );

        assert!(calls(&events).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            InterceptEvent::Discarded {
                reason: DiscardReason::Overflow,
                ..
            }
        )));
        assert_eq!(narrative(&events), "Hi  bye");
    }

    #[test]
    fn overflow_before_any_brace_returns_to_passthrough() {
        let interceptor = Interceptor::new(DEFAULT_SENTINEL, 16);
        let events = run_with(interceptor, &["[USE_TOOL]", "a_very_long_tool_name", "!"]);

        assert!(calls(&events).is_empty());
        assert_eq!(narrative(&events), "!");
    }

    #[test]
    fn held_back_prefix_is_flushed_at_end() {
        let events = run(&["See clause [US"]);
        assert_eq!(narrative(&events), "See clause [US");
    }

    #[test]
    fn false_sentinel_prefix_is_released_on_next_token() {
        let mut interceptor = Interceptor::new(DEFAULT_SENTINEL, LIMIT);

        assert_eq!(
            interceptor.push("Section [U"),
            vec![InterceptEvent::Narrative("Section ".into())]
        );
        assert_eq!(
            interceptor.push("S Code] applies"),
            vec![InterceptEvent::Narrative("[US Code] applies".into())]
        );
    }

    #[test]
    fn custom_sentinel_and_empty_fallback() {
        let events = run_with(
            Interceptor::new("<<tool>>", LIMIT),
            &["a <<tool>>todo_manager{\"action\":\"list\"} b [USE_TOOL]"],
        );
        assert_eq!(calls(&events).len(), 1);
        assert_eq!(narrative(&events), "a  b [USE_TOOL]");

        assert_eq!(Interceptor::new("  ", LIMIT).sentinel(), DEFAULT_SENTINEL);
    }

    #[test]
    fn state_tracks_mode_and_buffer() {
        let mut interceptor = Interceptor::new(DEFAULT_SENTINEL, LIMIT);
        interceptor.push("ab [USE_TOOL]todo_manager{\"action\"");

        let state = interceptor.state();
        assert_eq!(state.mode, Mode::Buffering);
        assert_eq!(state.buffer, "[USE_TOOL]todo_manager{\"action\"");
        assert_eq!(state.emitted, 3);

        interceptor.push(":\"list\"}");
        assert_eq!(interceptor.state().mode, Mode::Passthrough);
        assert!(interceptor.state().buffer.is_empty());
    }

    #[test]
    fn partial_sentinel_len_finds_longest_proper_prefix() {
        assert_eq!(partial_sentinel_len("abc [USE_", "[USE_TOOL]"), 5);
        assert_eq!(partial_sentinel_len("abc [", "[USE_TOOL]"), 1);
        assert_eq!(partial_sentinel_len("abc", "[USE_TOOL]"), 0);
        assert_eq!(partial_sentinel_len("[USE_TOOL]", "[USE_TOOL]"), 0);
    }

    #[test]
    fn brace_counter_ignores_text_before_first_brace() {
        let mut counter = BraceCounter::default();
        for c in "name \"} ".chars() {
            assert!(!counter.feed(c));
        }
        assert!(!counter.started());

        let closed: Vec<bool> = "{\"a\":{}}".chars().map(|c| counter.feed(c)).collect();
        assert_eq!(closed.iter().filter(|&&b| b).count(), 1);
        assert_eq!(closed.last(), Some(&true));
        assert_eq!(counter.depth(), 0);
    }
}
