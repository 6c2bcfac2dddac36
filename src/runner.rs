//! `Runner` — drives every eval in a loaded `Manifest` through a fresh
//! `Workflow`, scores the outcome, and hands results to a `ResultSink`.
//!
//! Grounded on `lev/runner2.py::run_host_evals`'s per-eval loop
//! (`host.reset()` → ask the question → build a result record → `finally:
//! host.cleanup()`) and on `lev/results.py`'s `McpEvaluationResult`/
//! `ResultSink` shapes, adapted to the `Workflow.ask()` entry point instead
//! of the superseded `McpHost.prompt()`. The `ToolRegistry` itself is built
//! once per `Runner` from the manifest's full `mcps` set (§4.3) and shared
//! across every eval's agent — an eval's `mcps` list is only the allow-list
//! `validate_mcp_usage` checks against, not a filter on which servers the
//! agent can see.

use crate::error::Result;
use crate::host::{Host, HostConfig};
use crate::introspector::Introspector;
use crate::judge::Judge;
use crate::manifest::{Eval, Manifest};
use crate::mcp::{RmcpToolClient, ToolRegistry};
use crate::provider_registry::LlmProviderRegistry;
use crate::agent::ToolAgent;
use crate::scoring::{build_scorers, validate_mcp_usage, ScoreFunction, ScoringContext};
use crate::telemetry::{McpCallLogger, ToolCallEvent};
use crate::workflow::{Workflow, WorkflowConfig};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// One eval's fully scored outcome, ready to hand to a `ResultSink`.
#[derive(Debug, Clone, Serialize)]
pub struct EvalResult {
    pub eval_id: String,
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub reasoning: String,
    pub mcp_valid: bool,
    pub tool_calls: usize,
    pub success: bool,
    pub error: Option<String>,
}

/// Anything that can persist a batch of results. Implemented here by
/// `TsvResultSink`; kept as a trait so callers embedding this crate can
/// plug in their own sink.
pub trait ResultSink {
    fn write(&self, results: &[EvalResult]) -> Result<()>;
}

pub struct TsvResultSink {
    path: std::path::PathBuf,
}

impl TsvResultSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl ResultSink for TsvResultSink {
    fn write(&self, results: &[EvalResult]) -> Result<()> {
        let mut out = String::from("eval_id\tquestion\tanswer\tscore\treasoning\tmcp_valid\ttool_calls\tsuccess\terror\n");
        for r in results {
            out.push_str(&format!(
                "{}\t{}\t{}\t{:.4}\t{}\t{}\t{}\t{}\t{}\n",
                tsv_escape(&r.eval_id),
                tsv_escape(&r.question),
                tsv_escape(&r.answer),
                r.score,
                tsv_escape(&r.reasoning),
                r.mcp_valid,
                r.tool_calls,
                r.success,
                tsv_escape(r.error.as_deref().unwrap_or(""))
            ));
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }
}

fn tsv_escape(field: &str) -> String {
    field.replace('\t', " ").replace('\n', "\\n")
}

/// Build the one `ToolRegistry` a `Runner` uses for every eval, from the
/// manifest's full `mcps` map.
fn build_registry(manifest: &Manifest) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for config in manifest.mcps.values() {
        registry.register(Arc::new(RmcpToolClient::new(config.clone())));
    }
    registry
}

pub struct Runner {
    manifest: Manifest,
    providers: Arc<LlmProviderRegistry>,
    telemetry: Option<Arc<McpCallLogger>>,
    judge: Arc<Judge>,
    registry: Arc<ToolRegistry>,
    limit: Option<usize>,
}

impl Runner {
    pub fn new(manifest: Manifest, providers: Arc<LlmProviderRegistry>, telemetry: Option<Arc<McpCallLogger>>) -> Result<Self> {
        let judge_client = providers.get_judge()?;
        let registry = Arc::new(build_registry(&manifest));
        Ok(Self { manifest, providers, telemetry, judge: Arc::new(Judge::new(judge_client)), registry, limit: None })
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub async fn run(&self) -> Result<Vec<EvalResult>> {
        let mut results = Vec::new();
        let evals: Vec<&Eval> = match self.limit {
            Some(n) => self.manifest.evals.iter().take(n).collect(),
            None => self.manifest.evals.iter().collect(),
        };

        self.registry.connect_all().await;

        for eval in evals {
            let result = self.run_one(eval).await;
            results.push(result);
        }

        self.registry.disconnect_all().await;

        Ok(results)
    }

    async fn run_one(&self, eval: &Eval) -> EvalResult {
        match self.try_run_one(eval).await {
            Ok(result) => result,
            Err(e) => EvalResult {
                eval_id: eval.id.clone(),
                question: eval.question.clone(),
                answer: String::new(),
                score: 0.0,
                reasoning: format!("eval failed before scoring: {e}"),
                mcp_valid: false,
                tool_calls: 0,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    async fn try_run_one(&self, eval: &Eval) -> Result<EvalResult> {
        let solver = self.providers.get_solver()?;
        let asker = self.providers.get_asker()?;

        // Every eval's agent shares the one registry built from the full
        // manifest's `mcps` — `eval.mcps` is only the allow-list checked by
        // `validate_mcp_usage` below, never a filter on which servers the
        // agent can see or call.
        let agent = ToolAgent::new(solver, "You are a helpful assistant with access to tools.").with_registry(self.registry.clone());
        let host_config = HostConfig { max_steps: eval.execution.max_steps.unwrap_or(8) };
        let host = Host::new(agent, host_config);

        let introspector = Introspector::new(asker);
        let mut workflow = Workflow::new(host, Some(introspector), WorkflowConfig::default());

        let answer = workflow.ask(&eval.question).await;
        let answer = match answer {
            Ok(a) => a,
            Err(e) => {
                return Ok(EvalResult {
                    eval_id: eval.id.clone(),
                    question: eval.question.clone(),
                    answer: String::new(),
                    score: 0.0,
                    reasoning: format!("workflow failed: {e}"),
                    mcp_valid: false,
                    tool_calls: 0,
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        };

        let transcript = workflow.host().agent().transcript().clone();
        self.log_invocations(eval, &transcript);

        let scorers = build_scorers(&eval.scoring, self.judge.clone());
        let score_fn = ScoreFunction::new(scorers);
        let context = ScoringContext { question: &eval.question, transcript: &transcript, answer: &answer };
        let mut score = score_fn.score(&context).await?;

        let mcp_valid = match validate_mcp_usage(&eval.mcps, &transcript) {
            Ok(()) => true,
            Err(server) => {
                score.value /= 2.0;
                score.reason = format!("{} [invalid MCP usage: used {server} not in allowed set]", score.reason);
                false
            }
        };

        Ok(EvalResult {
            eval_id: eval.id.clone(),
            question: eval.question.clone(),
            answer,
            score: score.value,
            reasoning: score.reason,
            mcp_valid,
            tool_calls: transcript.invocations().len(),
            success: true,
            error: None,
        })
    }

    fn log_invocations(&self, eval: &Eval, transcript: &crate::transcript::ChatTranscript) {
        let Some(logger) = &self.telemetry else { return };
        for invocation in transcript.invocations() {
            let success = invocation.result.get("success").and_then(serde_json::Value::as_bool).unwrap_or(true);
            let event = ToolCallEvent {
                timestamp: Utc::now(),
                eval_id: eval.id.clone(),
                server_name: invocation.server_name.clone(),
                tool_name: invocation.tool_name.clone(),
                success,
                duration_ms: 0,
            };
            if let Err(e) = logger.log(&event) {
                tracing::warn!(error = %e, "failed to write telemetry event");
            }
        }
    }
}
