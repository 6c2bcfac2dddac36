//! `LlmCritiqueScorer` — delegates scoring to a judge model that reads the
//! rendered conversation trace and critiques the final answer freely.
//!
//! Grounded on `lev/scoring.py::LLMJudgeScorer`'s `CRITIQUE` mode.

use crate::error::Result;
use crate::judge::Judge;
use crate::scoring::{Score, Scorer, ScoringContext};
use async_trait::async_trait;
use std::sync::Arc;

pub struct LlmCritiqueScorer {
    judge: Arc<Judge>,
}

impl LlmCritiqueScorer {
    pub fn new(judge: Arc<Judge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Scorer for LlmCritiqueScorer {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        let trace = context.transcript.render_trace(200);
        let verdict = self.judge.critique(context.question, &trace, context.answer).await?;
        Ok(Score { value: verdict.score.clamp(0.0, 1.0), reason: verdict.reason })
    }
}
