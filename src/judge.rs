//! `Judge` — wraps a `ModelClient` with the two judging prompt templates
//! (critique, extract-value) and parses its verdict back out of free text.
//!
//! Grounded on `lev/judge.py`'s import surface (`JUDGE_CRITIQUE_USER_PROMPT_TEMPLATE`,
//! `JUDGE_EXTRACT_USER_PROMPT_TEMPLATE`) and on `lev/scoring.py::LLMJudgeScorer`'s
//! two modes (`CRITIQUE` vs `EXTRACT`); §4.8 describes the score/reason JSON
//! contract this module's prompts ask the judge model to return.

use crate::error::{HarnessError, Result};
use crate::model::ModelClient;
use crate::transcript::{ModelMessage, Role};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeMode {
    Critique,
    Extract,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeVerdict {
    pub score: f64,
    pub reason: String,
}

pub struct Judge {
    model: Arc<dyn ModelClient>,
}

const CRITIQUE_SYSTEM_PROMPT: &str = "You are a strict evaluator judging whether an assistant's answer correctly \
and completely addresses the user's question, given the full conversation trace. \
Respond with a single JSON object of the form {\"score\": <0.0-1.0>, \"reason\": \"<one sentence>\"}. \
Do not include any other text.";

const EXTRACT_SYSTEM_PROMPT: &str = "You are extracting a single value from an assistant's answer and comparing it \
against an expected value. Respond with a single JSON object of the form \
{\"score\": <0.0 or 1.0>, \"reason\": \"<one sentence>\"}, scoring 1.0 only if the extracted value matches the \
expected value. Do not include any other text.";

impl Judge {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    pub async fn critique(&self, question: &str, trace: &str, answer: &str) -> Result<JudgeVerdict> {
        let user_prompt = format!(
            "Question: {question}\n\nConversation trace:\n{trace}\n\nFinal answer: {answer}\n\nJudge this answer."
        );
        self.judge(CRITIQUE_SYSTEM_PROMPT, &user_prompt, JudgeMode::Critique).await
    }

    pub async fn extract_value(&self, question: &str, answer: &str, expected: &serde_json::Value) -> Result<JudgeVerdict> {
        let user_prompt = format!(
            "Question: {question}\n\nAssistant answer: {answer}\n\nExpected value: {expected}\n\nDoes the answer contain the expected value?"
        );
        self.judge(EXTRACT_SYSTEM_PROMPT, &user_prompt, JudgeMode::Extract).await
    }

    async fn judge(&self, system_prompt: &str, user_prompt: &str, mode: JudgeMode) -> Result<JudgeVerdict> {
        let messages = vec![
            ModelMessage { role: Role::System, content: Some(system_prompt.to_string()), tool_calls: None, tool_call_id: None },
            ModelMessage { role: Role::User, content: Some(user_prompt.to_string()), tool_calls: None, tool_call_id: None },
        ];
        let response = self.model.chat_complete(&messages, None).await?;
        let content = response.content.ok_or_else(|| {
            HarnessError::Scoring(format!("judge ({mode:?}) returned no content"))
        })?;
        parse_verdict(&content)
    }
}

impl std::fmt::Debug for JudgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeMode::Critique => write!(f, "critique"),
            JudgeMode::Extract => write!(f, "extract"),
        }
    }
}

/// Parse the judge's verdict, tolerating a model that wraps the JSON object
/// in prose or a markdown code fence by extracting the first balanced
/// `{...}` span.
fn parse_verdict(content: &str) -> Result<JudgeVerdict> {
    let trimmed = content.trim();
    if let Ok(verdict) = serde_json::from_str::<JudgeVerdict>(trimmed) {
        return Ok(verdict);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            let candidate = &trimmed[start..=end];
            if let Ok(verdict) = serde_json::from_str::<JudgeVerdict>(candidate) {
                return Ok(verdict);
            }
        }
    }

    Err(HarnessError::Scoring(format!("could not parse judge verdict from response: {content}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let verdict = parse_verdict(r#"{"score": 0.8, "reason": "mostly correct"}"#).unwrap();
        assert_eq!(verdict.score, 0.8);
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let verdict = parse_verdict("Here is my verdict:\n{\"score\": 1.0, \"reason\": \"exact match\"}\nThanks.").unwrap();
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn rejects_unparseable_content() {
        assert!(parse_verdict("I cannot judge this.").is_err());
    }
}
