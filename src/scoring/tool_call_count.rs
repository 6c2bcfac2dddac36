//! `ToolCallCountScorer` — checks that a set of named tools were each
//! invoked a permitted number of times, and optionally that their first
//! invocations appeared in a declared order.
//!
//! Grounded on §4.8's tool-call-count scorer; there is no direct Python
//! counterpart in `lev/scoring.py`, so this is built from the spec's
//! configuration model directly: `calls` maps a tool name to an
//! `exact`/`min`/`max` constraint (`exact` overrides `min`/`max` when set),
//! and `order_matters` additionally requires the declared tools' first
//! occurrences to appear in the same relative order they were declared in.

use crate::error::Result;
use crate::manifest::CallCountConstraint;
use crate::scoring::{Score, Scorer, ScoringContext};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;

pub struct ToolCallCountScorer {
    calls: IndexMap<String, CallCountConstraint>,
    order_matters: bool,
}

impl ToolCallCountScorer {
    pub fn new(calls: IndexMap<String, CallCountConstraint>, order_matters: bool) -> Self {
        Self { calls, order_matters }
    }

    fn satisfies(constraint: &CallCountConstraint, count: usize) -> bool {
        if let Some(exact) = constraint.exact {
            return count == exact;
        }
        let min_ok = constraint.min.is_none_or(|min| count >= min);
        let max_ok = constraint.max.is_none_or(|max| count <= max);
        min_ok && max_ok
    }

    fn describe(constraint: &CallCountConstraint) -> String {
        if let Some(exact) = constraint.exact {
            return format!("exactly {exact}");
        }
        match (constraint.min, constraint.max) {
            (Some(min), Some(max)) => format!("[{min}, {max}]"),
            (Some(min), None) => format!(">= {min}"),
            (None, Some(max)) => format!("<= {max}"),
            (None, None) => "any count".to_string(),
        }
    }

    /// First-occurrence index of every invoked tool name, in invocation
    /// order.
    fn first_occurrences(context: &ScoringContext<'_>) -> HashMap<&str, usize> {
        let mut first_index = HashMap::new();
        for (idx, inv) in context.transcript.invocations().iter().enumerate() {
            first_index.entry(inv.tool_name.as_str()).or_insert(idx);
        }
        first_index
    }

    /// Among the declared tools that were actually invoked, their
    /// first-occurrence indices must be non-decreasing in declaration order.
    fn order_satisfied(&self, context: &ScoringContext<'_>) -> bool {
        let first_index = Self::first_occurrences(context);
        let observed: Vec<usize> = self
            .calls
            .keys()
            .filter_map(|tool| first_index.get(tool.as_str()).copied())
            .collect();
        observed.windows(2).all(|w| w[0] <= w[1])
    }
}

#[async_trait]
impl Scorer for ToolCallCountScorer {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        if self.calls.is_empty() {
            return Ok(Score { value: 0.0, reason: "tool_call_count scorer configured with no tools".to_string() });
        }

        let mut failures = Vec::new();
        for (tool, constraint) in &self.calls {
            let count = context.transcript.invocations().iter().filter(|inv| &inv.tool_name == tool).count();
            if !Self::satisfies(constraint, count) {
                failures.push(format!("'{tool}' called {count} time(s), expected {}", Self::describe(constraint)));
            }
        }

        if !failures.is_empty() {
            return Ok(Score { value: 0.0, reason: failures.join("; ") });
        }

        if self.order_matters && !self.order_satisfied(context) {
            return Ok(Score {
                value: 0.0,
                reason: format!("tool call counts satisfied but first-occurrence order did not match declared order {:?}", self.calls.keys().collect::<Vec<_>>()),
            });
        }

        Ok(Score { value: 1.0, reason: "all tool call count constraints satisfied".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChatTranscript;

    fn constraint(exact: Option<usize>, min: Option<usize>, max: Option<usize>) -> CallCountConstraint {
        CallCountConstraint { exact, min, max }
    }

    #[tokio::test]
    async fn passes_within_range() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "read_file", Default::default(), serde_json::json!({}));
        transcript.record_invocation("files", "read_file", Default::default(), serde_json::json!({}));
        let calls = IndexMap::from([("read_file".to_string(), constraint(None, Some(1), Some(2)))]);
        let scorer = ToolCallCountScorer::new(calls, false);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn exact_overrides_min_max() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "read_file", Default::default(), serde_json::json!({}));
        let calls = IndexMap::from([("read_file".to_string(), constraint(Some(1), Some(5), Some(10)))]);
        let scorer = ToolCallCountScorer::new(calls, false);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn fails_below_minimum() {
        let transcript = ChatTranscript::new();
        let calls = IndexMap::from([("read_file".to_string(), constraint(None, Some(1), None))]);
        let scorer = ToolCallCountScorer::new(calls, false);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }

    #[tokio::test]
    async fn multiple_tools_all_must_pass() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "list_dir", Default::default(), serde_json::json!({}));
        let calls = IndexMap::from([
            ("list_dir".to_string(), constraint(Some(1), None, None)),
            ("read_file".to_string(), constraint(Some(1), None, None)),
        ]);
        let scorer = ToolCallCountScorer::new(calls, false);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }

    #[tokio::test]
    async fn order_matters_passes_when_declared_order_observed() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "list_dir", Default::default(), serde_json::json!({}));
        transcript.record_invocation("files", "read_file", Default::default(), serde_json::json!({}));
        let calls = IndexMap::from([
            ("list_dir".to_string(), constraint(Some(1), None, None)),
            ("read_file".to_string(), constraint(Some(1), None, None)),
        ]);
        let scorer = ToolCallCountScorer::new(calls, true);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn order_matters_fails_when_order_reversed() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("files", "read_file", Default::default(), serde_json::json!({}));
        transcript.record_invocation("files", "list_dir", Default::default(), serde_json::json!({}));
        let calls = IndexMap::from([
            ("list_dir".to_string(), constraint(Some(1), None, None)),
            ("read_file".to_string(), constraint(Some(1), None, None)),
        ]);
        let scorer = ToolCallCountScorer::new(calls, true);
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        assert_eq!(scorer.score(&context).await.unwrap().value, 0.0);
    }
}
