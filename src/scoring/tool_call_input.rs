//! `ToolCallInputScorer` — checks the arguments a named tool's first
//! invocation was called with against a set of per-field constraints.
//!
//! Grounded on §4.8's tool-call-input scorer; `inputs` maps a tool name to
//! a list of `{field, value, mode}` constraints, each checked against that
//! tool's first invocation's named argument under `exact`/`contains`/
//! `regex` comparison. A missing tool or a missing field on that
//! invocation scores 0.0 rather than skipping the constraint.

use crate::error::{HarnessError, Result};
use crate::manifest::{FieldConstraint, FieldMatchMode};
use crate::scoring::{Score, Scorer, ScoringContext};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

pub struct ToolCallInputScorer {
    inputs: HashMap<String, Vec<FieldConstraint>>,
}

impl ToolCallInputScorer {
    pub fn new(inputs: HashMap<String, Vec<FieldConstraint>>) -> Self {
        Self { inputs }
    }

    fn plain_string(v: &serde_json::Value) -> String {
        match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn field_matches(actual: &serde_json::Value, constraint: &FieldConstraint) -> Result<bool> {
        match constraint.mode {
            FieldMatchMode::Exact => Ok(*actual == constraint.value),
            FieldMatchMode::Contains => Ok(Self::plain_string(actual).contains(&Self::plain_string(&constraint.value))),
            FieldMatchMode::Regex => {
                let pattern = constraint
                    .value
                    .as_str()
                    .ok_or_else(|| HarnessError::Scoring(format!("regex constraint on field '{}' is not a string pattern", constraint.field)))?;
                let re = Regex::new(pattern)
                    .map_err(|e| HarnessError::Scoring(format!("invalid regex pattern '{pattern}': {e}")))?;
                Ok(re.is_match(&Self::plain_string(actual)))
            }
        }
    }
}

#[async_trait]
impl Scorer for ToolCallInputScorer {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        if self.inputs.is_empty() {
            return Ok(Score { value: 0.0, reason: "tool_call_input scorer configured with no tools".to_string() });
        }

        let mut failures = Vec::new();
        for (tool, constraints) in &self.inputs {
            let Some(invocation) = context.transcript.invocations().iter().find(|inv| &inv.tool_name == tool) else {
                failures.push(format!("tool '{tool}' was never invoked"));
                continue;
            };

            for constraint in constraints {
                let Some(actual) = invocation.arguments.get(&constraint.field) else {
                    failures.push(format!("tool '{tool}' invocation had no field '{}'", constraint.field));
                    continue;
                };
                if !Self::field_matches(actual, constraint)? {
                    failures.push(format!(
                        "tool '{tool}' field '{}' did not match ({:?})",
                        constraint.field, constraint.mode
                    ));
                }
            }
        }

        if failures.is_empty() {
            Ok(Score { value: 1.0, reason: "all tool call input constraints satisfied".to_string() })
        } else {
            Ok(Score { value: 0.0, reason: failures.join("; ") })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChatTranscript;

    fn args(pairs: &[(&str, &str)]) -> serde_json::Map<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string()))).collect()
    }

    fn field(field: &str, value: serde_json::Value, mode: FieldMatchMode) -> FieldConstraint {
        FieldConstraint { field: field.to_string(), value, mode }
    }

    #[tokio::test]
    async fn exact_match_on_first_invocation() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "read_file", args(&[("path", "/etc/passwd")]), serde_json::json!({}));
        let inputs = HashMap::from([(
            "read_file".to_string(),
            vec![field("path", serde_json::json!("/etc/passwd"), FieldMatchMode::Exact)],
        )]);
        let scorer = ToolCallInputScorer::new(inputs);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn regex_match() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "read_file", args(&[("path", "/tmp/report-42.csv")]), serde_json::json!({}));
        let inputs = HashMap::from([(
            "read_file".to_string(),
            vec![field("path", serde_json::json!(r"report-\d+\.csv"), FieldMatchMode::Regex)],
        )]);
        let scorer = ToolCallInputScorer::new(inputs);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn missing_field_scores_zero() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "read_file", args(&[("other", "x")]), serde_json::json!({}));
        let inputs = HashMap::from([(
            "read_file".to_string(),
            vec![field("path", serde_json::json!("/etc/passwd"), FieldMatchMode::Exact)],
        )]);
        let scorer = ToolCallInputScorer::new(inputs);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }

    #[tokio::test]
    async fn missing_tool_scores_zero() {
        let transcript = ChatTranscript::new();
        let inputs = HashMap::from([(
            "read_file".to_string(),
            vec![field("path", serde_json::json!("/etc/passwd"), FieldMatchMode::Exact)],
        )]);
        let scorer = ToolCallInputScorer::new(inputs);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }

    #[tokio::test]
    async fn contains_mode() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("search", "web_search", args(&[("query", "capital of france")]), serde_json::json!({}));
        let inputs = HashMap::from([(
            "web_search".to_string(),
            vec![field("query", serde_json::json!("france"), FieldMatchMode::Contains)],
        )]);
        let scorer = ToolCallInputScorer::new(inputs);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }
}
