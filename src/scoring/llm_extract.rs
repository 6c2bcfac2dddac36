//! `LlmExtractValueScorer` — delegates to a judge model that extracts a
//! single value from the answer and compares it against an expected value.
//!
//! Grounded on `lev/scoring.py::LLMJudgeScorer`'s `EXTRACT` mode.

use crate::error::Result;
use crate::judge::Judge;
use crate::scoring::{Score, Scorer, ScoringContext};
use async_trait::async_trait;
use std::sync::Arc;

pub struct LlmExtractValueScorer {
    judge: Arc<Judge>,
    expected: serde_json::Value,
}

impl LlmExtractValueScorer {
    pub fn new(judge: Arc<Judge>, expected: serde_json::Value) -> Self {
        Self { judge, expected }
    }
}

#[async_trait]
impl Scorer for LlmExtractValueScorer {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        let verdict = self.judge.extract_value(context.question, context.answer, &self.expected).await?;
        Ok(Score { value: verdict.score.clamp(0.0, 1.0), reason: verdict.reason })
    }
}
