//! `ContainsStringScorer` — binary pass/fail on whether the final answer
//! contains a target substring.
//!
//! Grounded on `lev/scoring.py::ContainsStringScorer`.

use crate::error::Result;
use crate::scoring::{Score, Scorer, ScoringContext};
use async_trait::async_trait;

pub struct ContainsStringScorer {
    target: String,
    case_sensitive: bool,
}

impl ContainsStringScorer {
    pub fn new(target: String, case_sensitive: bool) -> Self {
        Self { target, case_sensitive }
    }
}

#[async_trait]
impl Scorer for ContainsStringScorer {
    async fn score(&self, context: &ScoringContext<'_>) -> Result<Score> {
        let found = if self.case_sensitive {
            context.answer.contains(&self.target)
        } else {
            context.answer.to_lowercase().contains(&self.target.to_lowercase())
        };

        Ok(Score {
            value: if found { 1.0 } else { 0.0 },
            reason: if found {
                format!("answer contains \"{}\"", self.target)
            } else {
                format!("answer does not contain \"{}\"", self.target)
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChatTranscript;

    #[tokio::test]
    async fn case_insensitive_match_by_default_is_off() {
        let scorer = ContainsStringScorer::new("Paris".to_string(), true);
        let transcript = ChatTranscript::new();
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "the capital is paris" };
        let score = scorer.score(&context).await.unwrap();
        assert_eq!(score.value, 0.0);
    }

    #[tokio::test]
    async fn case_insensitive_match_when_enabled() {
        let scorer = ContainsStringScorer::new("Paris".to_string(), false);
        let transcript = ChatTranscript::new();
        let context = ScoringContext { question: "q", transcript: &transcript, answer: "the capital is paris" };
        let score = scorer.score(&context).await.unwrap();
        assert_eq!(score.value, 1.0);
    }
}
