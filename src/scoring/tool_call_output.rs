//! `ToolCallOutputScorer` — checks a named tool's first invocation result
//! against an expected JSON fragment via deep structural comparison.
//!
//! Grounded on §4.8's tool-call-output scorer: `results` maps a tool name
//! to an expected fragment; objects are compared key by key (extra actual
//! keys allowed only when `ignore_extra` is set), lists are compared
//! elementwise, numeric leaves compare within `tolerance`, and every other
//! leaf compares by equality.

use crate::error::Result;
use crate::scoring::{Score, Scorer, ScoringContext};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub struct ToolCallOutputScorer {
    results: HashMap<String, Value>,
    tolerance: f64,
    ignore_extra: bool,
}

impl ToolCallOutputScorer {
    pub fn new(results: HashMap<String, Value>, tolerance: f64, ignore_extra: bool) -> Self {
        Self { results, tolerance, ignore_extra }
    }

    fn deep_match(&self, actual: &Value, expected: &Value) -> bool {
        match expected {
            Value::Object(expected_obj) => {
                let Value::Object(actual_obj) = actual else { return false };
                if !self.ignore_extra && actual_obj.len() != expected_obj.len() {
                    return false;
                }
                expected_obj.iter().all(|(k, v)| actual_obj.get(k).is_some_and(|a| self.deep_match(a, v)))
            }
            Value::Array(expected_items) => {
                let Value::Array(actual_items) = actual else { return false };
                actual_items.len() == expected_items.len()
                    && actual_items.iter().zip(expected_items).all(|(a, e)| self.deep_match(a, e))
            }
            Value::Number(expected_num) => match (actual.as_f64(), expected_num.as_f64()) {
                (Some(a), Some(e)) => (a - e).abs() <= self.tolerance,
                _ => false,
            },
            other => actual == other,
        }
    }
}

#[async_trait]
impl Scorer for ToolCallOutputScorer {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        if self.results.is_empty() {
            return Ok(Score { value: 0.0, reason: "tool_call_output scorer configured with no tools".to_string() });
        }

        let mut failures = Vec::new();
        for (tool, expected) in &self.results {
            let Some(invocation) = context.transcript.invocations().iter().find(|inv| &inv.tool_name == tool) else {
                failures.push(format!("tool '{tool}' was never invoked"));
                continue;
            };
            if !self.deep_match(&invocation.result, expected) {
                failures.push(format!("tool '{tool}' result did not match expected fragment"));
            }
        }

        if failures.is_empty() {
            Ok(Score { value: 1.0, reason: "all tool call output constraints satisfied".to_string() })
        } else {
            Ok(Score { value: 0.0, reason: failures.join("; ") })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChatTranscript;

    #[tokio::test]
    async fn matches_nested_fragment_ignoring_extra_keys() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("math", "add", Default::default(), serde_json::json!({"success": true, "result": 5, "extra": "noise"}));
        let results = HashMap::from([("add".to_string(), serde_json::json!({"result": 5}))]);
        let scorer = ToolCallOutputScorer::new(results, 1e-6, true);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn rejects_extra_keys_when_ignore_extra_is_false() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("math", "add", Default::default(), serde_json::json!({"result": 5, "extra": "noise"}));
        let results = HashMap::from([("add".to_string(), serde_json::json!({"result": 5}))]);
        let scorer = ToolCallOutputScorer::new(results, 1e-6, false);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }

    #[tokio::test]
    async fn numeric_leaves_compare_within_tolerance() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("math", "divide", Default::default(), serde_json::json!({"result": 0.3333333}));
        let results = HashMap::from([("divide".to_string(), serde_json::json!({"result": 0.333333}))]);
        let scorer = ToolCallOutputScorer::new(results, 1e-5, true);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn lists_compared_elementwise() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "list_dir", Default::default(), serde_json::json!({"result": ["a.txt", "b.txt"]}));
        let results = HashMap::from([("list_dir".to_string(), serde_json::json!({"result": ["a.txt", "b.txt"]}))]);
        let scorer = ToolCallOutputScorer::new(results, 1e-6, true);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn missing_tool_scores_zero() {
        let transcript = ChatTranscript::new();
        let results = HashMap::from([("add".to_string(), serde_json::json!({"result": 5}))]);
        let scorer = ToolCallOutputScorer::new(results, 1e-6, true);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }
}
