//! `Introspector` — a second model-backed role that watches the transcript
//! produced by a `Host::step` call. It has two distinct gates, never both
//! consulted on the same turn: `validate` judges a finished, tool-free
//! answer against the original question; `plan` judges a trace that just
//! ran tools and decides whether another round of tool use is warranted
//! before the agent is allowed to synthesize a final answer.
//!
//! Grounded on §4.6's fail-open contract: a judge model that returns
//! unparseable JSON must never abort the run, since introspection is a
//! quality gate, not a correctness gate. Mirrors the defensive
//! `json.loads` + fallback pattern used throughout `lev/judge.py`'s
//! imports and `lev/scoring.py`'s verdict parsing, and the two-verdict
//! split described by `lev/controller.py`'s `Introspector`.

use crate::model::ModelClient;
use crate::transcript::{ModelMessage, Role};
use serde::Deserialize;
use std::sync::Arc;

/// The no-tools gate's verdict: does the candidate answer fully address
/// the question, or does the agent need another nudge?
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationVerdict {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub followup: Option<String>,
}

impl Default for ValidationVerdict {
    /// Fail open: if the introspector model's output can't be parsed,
    /// behave as though the answer were valid rather than looping forever.
    fn default() -> Self {
        Self { valid: true, followup: None }
    }
}

/// The post-tool-use gate's verdict: should the agent run another round of
/// tools before synthesizing, or is it time to wrap up?
#[derive(Debug, Clone, Deserialize)]
pub struct PlanVerdict {
    #[serde(default, rename = "continue")]
    pub should_continue: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub next_prompt: Option<String>,
}

impl Default for PlanVerdict {
    /// Fail open: if the planner's output can't be parsed, stop asking for
    /// more tool use rather than spinning the agent forever.
    fn default() -> Self {
        Self { should_continue: false, reason: "failed open: unparseable planner output".to_string(), next_prompt: None }
    }
}

const VALIDATE_SYSTEM_PROMPT: &str = "You are reviewing whether an assistant's candidate answer fully addresses \
the user's original question, given the conversation trace. You never issue commands or call tools yourself; you \
only judge. Respond with a single JSON object of the form {\"valid\": <true|false>, \"followup\": \"<string, only \
when valid is false>\"}. Do not include any other text.";

const PLAN_SYSTEM_PROMPT: &str = "You are the agent's inner voice, reviewing a trace after it just ran one or more \
tools. Decide whether the evidence gathered so far is enough to answer the user, or whether another round of tool \
use is needed first. You never issue commands or call tools yourself; you only judge. Respond with a single JSON \
object of the form {\"continue\": <true|false>, \"reason\": \"<short string>\", \"next_prompt\": \"<string, only \
when continue is true>\"}. Do not include any other text.";

pub struct Introspector {
    model: Arc<dyn ModelClient>,
}

impl Introspector {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Ask whether `candidate_answer` satisfies `question`, given `trace`
    /// (a rendered transcript). Falls open to `valid: true` on any model or
    /// parse failure, since a broken introspector must not stall the
    /// workflow. Fires only on turns that produced no tool calls.
    pub async fn validate(&self, question: &str, trace: &str, candidate_answer: &str) -> ValidationVerdict {
        let user_prompt = format!(
            "Original question: {question}\n\nConversation trace:\n{trace}\n\nCandidate answer: {candidate_answer}\n\nIs this answer complete?"
        );
        let messages = vec![
            ModelMessage { role: Role::System, content: Some(VALIDATE_SYSTEM_PROMPT.to_string()), tool_calls: None, tool_call_id: None },
            ModelMessage { role: Role::User, content: Some(user_prompt), tool_calls: None, tool_call_id: None },
        ];

        let response = match self.model.chat_complete(&messages, None).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "introspector validate call failed, failing open");
                return ValidationVerdict::default();
            }
        };

        let Some(content) = response.content else {
            tracing::warn!("introspector validate returned empty content, failing open");
            return ValidationVerdict::default();
        };

        parse_json_or_default(&content, "validate")
    }

    /// Ask whether the agent should run another round of tools before
    /// synthesizing a final answer, given `trace` (a rendered transcript
    /// ending in tool results). Falls open to `continue: false`, since a
    /// broken planner must not keep the agent calling tools forever. Fires
    /// only on turns that did produce tool calls.
    pub async fn plan(&self, trace: &str) -> PlanVerdict {
        let user_prompt = format!("Conversation trace so far:\n{trace}\n\nIs more tool use needed before answering?");
        let messages = vec![
            ModelMessage { role: Role::System, content: Some(PLAN_SYSTEM_PROMPT.to_string()), tool_calls: None, tool_call_id: None },
            ModelMessage { role: Role::User, content: Some(user_prompt), tool_calls: None, tool_call_id: None },
        ];

        let response = match self.model.chat_complete(&messages, None).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "introspector plan call failed, failing open");
                return PlanVerdict::default();
            }
        };

        let Some(content) = response.content else {
            tracing::warn!("introspector plan returned empty content, failing open");
            return PlanVerdict::default();
        };

        parse_json_or_default(&content, "plan")
    }
}

fn parse_json_or_default<T: for<'de> Deserialize<'de> + Default>(content: &str, gate: &str) -> T {
    let trimmed = content.trim();
    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return v;
    }
    let (start, end) = (trimmed.find('{'), trimmed.rfind('}'));
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return v;
            }
        }
    }
    tracing::warn!(raw = %content, gate, "could not parse introspector verdict, failing open");
    T::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_validation_output_fails_open() {
        let verdict: ValidationVerdict = parse_json_or_default("not json at all", "validate");
        assert!(verdict.valid);
    }

    #[test]
    fn parses_invalid_verdict_with_followup() {
        let verdict: ValidationVerdict =
            parse_json_or_default(r#"{"valid": false, "followup": "check the other server too"}"#, "validate");
        assert!(!verdict.valid);
        assert_eq!(verdict.followup.as_deref(), Some("check the other server too"));
    }

    #[test]
    fn unparseable_plan_output_fails_open() {
        let verdict: PlanVerdict = parse_json_or_default("garbage", "plan");
        assert!(!verdict.should_continue);
    }

    #[test]
    fn parses_plan_verdict_requesting_another_round() {
        let verdict: PlanVerdict = parse_json_or_default(
            r#"{"continue": true, "reason": "need to list the directory", "next_prompt": "List the directory first."}"#,
            "plan",
        );
        assert!(verdict.should_continue);
        assert_eq!(verdict.next_prompt.as_deref(), Some("List the directory first."));
    }
}
