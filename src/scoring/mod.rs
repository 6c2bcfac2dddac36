//! Scoring: a `Scorer` trait with six concrete implementations, combined by
//! a weighted `ScoreFunction`.
//!
//! Grounded on `lev/scoring.py`: `Score`, `ScoringContext`, the `Scorer` ABC,
//! `ScoreFunction`'s weighted-average aggregation with a joined reason
//! trace, and the `build_scorers` factory — generalized here from Python's
//! duck-typed dict configs to the `ScorerConfig` enum already validated by
//! the manifest loader.

pub mod contains_string;
pub mod llm_critique;
pub mod llm_extract;
pub mod tool_call_count;
pub mod tool_call_input;
pub mod tool_call_output;

use crate::error::Result;
use crate::judge::Judge;
use crate::manifest::ScorerConfig;
use crate::transcript::ChatTranscript;
use async_trait::async_trait;
use std::sync::Arc;

/// A single scorer's verdict: a value in `[0.0, 1.0]` plus a human-readable
/// justification.
#[derive(Debug, Clone)]
pub struct Score {
    pub value: f64,
    pub reason: String,
}

/// Everything a scorer might need to evaluate one eval's outcome.
pub struct ScoringContext<'a> {
    pub question: &'a str,
    pub transcript: &'a ChatTranscript,
    pub answer: &'a str,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score>;
}

/// A weighted battery of scorers. `score` runs every scorer, then reports
/// the weighted average alongside a reason trace that concatenates each
/// scorer's own reason, suffixed with its weight.
pub struct ScoreFunction {
    scorers: Vec<(f64, Box<dyn Scorer>)>,
}

impl ScoreFunction {
    pub fn new(scorers: Vec<(f64, Box<dyn Scorer>)>) -> Self {
        Self { scorers }
    }

    /// Run every scorer and report the weighted average. A scorer that
    /// returns `Err` does not abort the aggregation — its contribution
    /// becomes `Score(0.0, <diagnostic>)` and the remaining scorers still
    /// run, since one broken judge call should degrade a result, not
    /// discard it.
    pub async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        if self.scorers.is_empty() {
            return Ok(Score { value: 0.0, reason: "no scorers configured".to_string() });
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut reasons = Vec::with_capacity(self.scorers.len());

        for (weight, scorer) in &self.scorers {
            let individual = match scorer.score(context).await {
                Ok(s) => s,
                Err(e) => Score { value: 0.0, reason: format!("scorer failed: {e}") },
            };
            weighted_sum += individual.value * weight;
            weight_total += weight;
            reasons.push(format!("{} (*{weight})", individual.reason));
        }

        let value = if weight_total > 0.0 { weighted_sum / weight_total } else { 0.0 };
        Ok(Score { value, reason: reasons.join("; ") })
    }
}

/// Build the scorer battery an eval's manifest entry describes. An unknown
/// or malformed scorer config is a configuration bug, so this returns an
/// error rather than skipping the entry silently.
pub fn build_scorers(configs: &[ScorerConfig], judge: Arc<Judge>) -> Vec<(f64, Box<dyn Scorer>)> {
    configs
        .iter()
        .map(|config| match config {
            ScorerConfig::LlmCritique { weight, .. } => {
                (*weight, Box::new(llm_critique::LlmCritiqueScorer::new(judge.clone())) as Box<dyn Scorer>)
            }
            ScorerConfig::LlmExtractValue { weight, expected, .. } => {
                (*weight, Box::new(llm_extract::LlmExtractValueScorer::new(judge.clone(), expected.clone())) as Box<dyn Scorer>)
            }
            ScorerConfig::ContainsString { weight, target, case_sensitive } => (
                *weight,
                Box::new(contains_string::ContainsStringScorer::new(target.clone(), *case_sensitive)) as Box<dyn Scorer>,
            ),
            ScorerConfig::ToolCallCount { weight, calls, order_matters } => (
                *weight,
                Box::new(tool_call_count::ToolCallCountScorer::new(calls.clone(), *order_matters)) as Box<dyn Scorer>,
            ),
            ScorerConfig::ToolCallInput { weight, inputs } => (
                *weight,
                Box::new(tool_call_input::ToolCallInputScorer::new(inputs.clone())) as Box<dyn Scorer>,
            ),
            ScorerConfig::ToolCallOutput { weight, results, tolerance, ignore_extra } => (
                *weight,
                Box::new(tool_call_output::ToolCallOutputScorer::new(results.clone(), *tolerance, *ignore_extra)) as Box<dyn Scorer>,
            ),
        })
        .collect()
}

/// Check that every server an eval's conversation actually invoked is in
/// the eval's allowed set. Grounded on `lev/scoring.py::validate_mcp_usage`.
pub fn validate_mcp_usage(allowed: &[String], transcript: &ChatTranscript) -> std::result::Result<(), String> {
    for invocation in transcript.invocations() {
        if !allowed.iter().any(|a| a == &invocation.server_name) {
            return Err(invocation.server_name.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubScorer(f64, &'static str);

    #[async_trait]
    impl Scorer for StubScorer {
        async fn score(&self, _context: &ScoringContext<'_>) -> Result<Score> {
            Ok(Score { value: self.0, reason: self.1.to_string() })
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl Scorer for FailingScorer {
        async fn score(&self, _context: &ScoringContext<'_>) -> Result<Score> {
            Err(crate::error::HarnessError::Scoring("judge unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn weighted_average_combines_scorers() {
        let function = ScoreFunction::new(vec![
            (1.0, Box::new(StubScorer(1.0, "perfect")) as Box<dyn Scorer>),
            (1.0, Box::new(StubScorer(0.0, "failed")) as Box<dyn Scorer>),
        ]);
        let transcript = ChatTranscript::new();
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        let score = function.score(&context).await.unwrap();
        assert!((score.value - 0.5).abs() < f64::EPSILON);
        assert!(score.reason.contains("perfect"));
        assert!(score.reason.contains("failed"));
    }

    #[tokio::test]
    async fn a_failing_scorer_does_not_abort_aggregation() {
        let function = ScoreFunction::new(vec![
            (1.0, Box::new(FailingScorer) as Box<dyn Scorer>),
            (1.0, Box::new(StubScorer(1.0, "passed")) as Box<dyn Scorer>),
        ]);
        let transcript = ChatTranscript::new();
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "a" };
        let score = function.score(&context).await.unwrap();
        assert!((score.value - 0.5).abs() < f64::EPSILON);
        assert!(score.reason.contains("scorer failed"));
        assert!(score.reason.contains("passed"));
    }

    #[test]
    fn validate_mcp_usage_flags_disallowed_server() {
        let mut transcript = ChatTranscript::new();
        transcript.record_invocation("shadow-server", "do_thing", Default::default(), serde_json::json!({}));
        let result = validate_mcp_usage(&["files".to_string()], &transcript);
        assert_eq!(result, Err("shadow-server".to_string()));
    }
}
