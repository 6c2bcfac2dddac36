//! `Workflow` — composes a `Host` and an `Introspector` into the outer
//! `ask` loop. Each `Host::step` produces a turn that either ran no tools
//! or ran some; these are two distinct gates, never both consulted on the
//! same turn. A tool-free turn is checked by `validate` against the
//! original question; once `validate` accepts it, or once a turn that did
//! run tools has been told to wrap up, `ask` returns. A turn that did run
//! tools is instead checked by `plan`, which can either send the agent
//! back for another round or hand it a synthesis instruction and mark the
//! loop done.
//!
//! Grounded on `lev/controller.py::Controller.run`'s step loop and its
//! paired `Introspector.validate`/`Introspector.plan_next` calls, adapted
//! from the superseded `lev/host/mcp_host.py::McpHost.prompt`, which fused
//! introspection into the same loop as tool execution instead of treating
//! it as a separate pass over a finished turn.

use crate::error::Result;
use crate::host::Host;
use crate::introspector::Introspector;
use crate::transcript::Role;

#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    /// Maximum number of outer step/gate cycles before giving up and
    /// falling back to the last non-empty assistant message on record.
    pub max_steps: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { max_steps: 8 }
    }
}

pub struct Workflow {
    host: Host,
    introspector: Option<Introspector>,
    config: WorkflowConfig,
}

impl Workflow {
    pub fn new(host: Host, introspector: Option<Introspector>, config: WorkflowConfig) -> Self {
        Self { host, introspector, config }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    /// Run the propose/validate/plan cycle until a gate lets the run
    /// finish or the step budget runs out. On exhaustion, falls back to
    /// the last non-empty assistant message rather than failing the eval.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        self.host.reset();

        let mut role = Role::User;
        let mut prompt = question.to_string();
        let mut done = false;

        for _ in 0..self.config.max_steps {
            let turn = self.host.step(&prompt, role).await?;

            if let Some(fatal) = &turn.fatal_error {
                return Ok(format!("HostError: {fatal}"));
            }

            if !turn.had_tools {
                if done {
                    return Ok(turn.content.unwrap_or_default());
                }

                let Some(introspector) = &self.introspector else {
                    return Ok(turn.content.unwrap_or_default());
                };

                let trace = self.host.agent().transcript().render_trace(100);
                let verdict = introspector.validate(question, &trace, turn.content.as_deref().unwrap_or("")).await;

                if verdict.valid {
                    return Ok(turn.content.unwrap_or_default());
                }

                role = Role::Developer;
                prompt = verdict.followup.unwrap_or_else(|| "Your answer is incomplete. Please continue addressing the original question.".to_string());
                continue;
            }

            // The turn ran tools. Ask the planner whether another round is
            // warranted before letting the agent synthesize a final answer.
            let plan = match &self.introspector {
                Some(introspector) => {
                    let trace = self.host.agent().transcript().render_trace(100);
                    Some(introspector.plan(&trace).await)
                }
                None => None,
            };

            if let Some(plan) = plan {
                if plan.should_continue {
                    role = Role::Developer;
                    prompt = plan.next_prompt.unwrap_or_else(|| "Continue investigating before answering.".to_string());
                    continue;
                }
            }

            role = Role::Developer;
            prompt = "Synthesize the final answer using the tool results.".to_string();
            done = true;
        }

        Ok(self
            .host
            .agent()
            .transcript()
            .last_nonempty_assistant_content()
            .map(str::to_string)
            .unwrap_or_else(|| "No final answer.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolAgent;
    use crate::error::Result as HarnessResult;
    use crate::host::HostConfig;
    use crate::model::{ModelClient, ModelResponse, ModelTool};
    use crate::transcript::ModelMessage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedClient {
        answer: String,
    }

    #[async_trait]
    impl ModelClient for FixedClient {
        fn name(&self) -> &str {
            "fixed"
        }
        fn default_model(&self) -> Option<&str> {
            None
        }
        async fn chat_complete(&self, _messages: &[ModelMessage], _tools: Option<&[ModelTool]>) -> HarnessResult<ModelResponse> {
            Ok(ModelResponse { content: Some(self.answer.clone()), tool_calls: vec![], finish_reason: "stop".to_string(), usage: None })
        }
    }

    struct CountingValidClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for CountingValidClient {
        fn name(&self) -> &str {
            "introspector"
        }
        fn default_model(&self) -> Option<&str> {
            None
        }
        async fn chat_complete(&self, _messages: &[ModelMessage], _tools: Option<&[ModelTool]>) -> HarnessResult<ModelResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelResponse {
                content: Some(r#"{"valid": true}"#.to_string()),
                tool_calls: vec![],
                finish_reason: "stop".to_string(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn ask_without_introspector_returns_first_answer() {
        let agent = ToolAgent::new(Arc::new(FixedClient { answer: "42".to_string() }), "be helpful");
        let host = Host::new(agent, HostConfig::default());
        let mut workflow = Workflow::new(host, None, WorkflowConfig::default());
        let answer = workflow.ask("what is the answer?").await.unwrap();
        assert_eq!(answer, "42");
    }

    #[tokio::test]
    async fn ask_stops_once_introspector_validates_the_answer() {
        let agent = ToolAgent::new(Arc::new(FixedClient { answer: "done".to_string() }), "be helpful");
        let host = Host::new(agent, HostConfig::default());
        let introspector = Introspector::new(Arc::new(CountingValidClient { calls: AtomicUsize::new(0) }));
        let mut workflow = Workflow::new(host, Some(introspector), WorkflowConfig::default());
        let answer = workflow.ask("question?").await.unwrap();
        assert_eq!(answer, "done");
    }
}
