//! `Host` — drives one `ToolAgent` through the propose → execute-tools →
//! reprompt loop, up to a configured step budget.
//!
//! Grounded on the newer `lev/mcp/mcp_host.py::McpHost.step` (the
//! `Turn`/`ToolError`/`McpHostConfig` shape is carried over directly; the
//! `while model_resp.tool_calls and counter < max_steps` loop is the
//! algorithm this module's `Host::step` implements), rather than the
//! superseded `lev/host/mcp_host.py::McpHost.prompt`, which fused
//! introspection into the same loop.

use crate::agent::ToolAgent;
use crate::error::Result;
use crate::transcript::{Role, ToolCallRef};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ToolError {
    pub tool_call_id: String,
    pub server_name: String,
    pub tool_name: String,
    pub error: String,
}

/// The outcome of one `Host::step` call: a candidate answer plus whatever
/// tool activity happened while producing it.
#[derive(Debug, Clone)]
pub struct Turn {
    pub content: Option<String>,
    pub had_tools: bool,
    pub tool_errors: Vec<ToolError>,
    pub fatal_error: Option<String>,
}

impl Turn {
    pub fn tools_failed(&self) -> bool {
        !self.tool_errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HostConfig {
    pub max_steps: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { max_steps: 8 }
    }
}

pub struct Host {
    agent: ToolAgent,
    config: HostConfig,
}

impl Host {
    pub fn new(agent: ToolAgent, config: HostConfig) -> Self {
        Self { agent, config }
    }

    pub fn agent(&self) -> &ToolAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut ToolAgent {
        &mut self.agent
    }

    pub fn reset(&mut self) {
        self.agent.reset();
    }

    pub async fn warm_up(&self) {
        self.agent.initialize().await;
    }

    pub async fn cleanup(&self) {
        self.agent.cleanup().await;
    }

    /// Send `prompt` under `role`, executing any tool calls the model
    /// requests until it produces a tool-call-free response or the step
    /// budget is exhausted.
    pub async fn step(&mut self, prompt: &str, role: Role) -> Result<Turn> {
        let mut response = match self.agent.propose(prompt, role).await {
            Ok(r) => r,
            Err(e) => return Ok(Turn { content: None, had_tools: false, tool_errors: vec![], fatal_error: Some(e.to_string()) }),
        };

        let mut had_tools = false;
        let mut tool_errors = Vec::new();
        let mut counter = 0usize;

        while !response.tool_calls.is_empty() && counter < self.config.max_steps {
            had_tools = true;
            let calls = response.tool_calls.clone();
            self.agent.transcript_mut().append_assistant_tool_call(response.content.clone().unwrap_or_default(), calls.clone());

            for call in &calls {
                let outcome = self.execute_tool_call(call).await;
                match outcome {
                    Ok(payload) => {
                        self.agent.transcript_mut().append_tool_response(call.id.clone(), payload.to_string());
                    }
                    Err(err) => {
                        tool_errors.push(err.clone());
                        let error_payload = serde_json::json!({"success": false, "error": err.error}).to_string();
                        self.agent.transcript_mut().append_tool_response(call.id.clone(), error_payload);
                    }
                }
            }

            counter += 1;
            response = match self.agent.propose_with_existing_messages().await {
                Ok(r) => r,
                Err(e) => {
                    return Ok(Turn {
                        content: self.agent.transcript().last_nonempty_assistant_content().map(str::to_string),
                        had_tools,
                        tool_errors,
                        fatal_error: Some(e.to_string()),
                    })
                }
            };
        }

        if !response.tool_calls.is_empty() {
            // Step budget exhausted while the model still wants to call tools.
            return Ok(Turn {
                content: self.agent.transcript().last_nonempty_assistant_content().map(str::to_string),
                had_tools,
                tool_errors,
                fatal_error: Some("Max steps reached with pending tool calls".to_string()),
            });
        }

        if let Some(content) = &response.content {
            self.agent.transcript_mut().append_assistant(content.clone());
        }

        Ok(Turn { content: response.content, had_tools, tool_errors, fatal_error: None })
    }

    async fn execute_tool_call(&mut self, call: &ToolCallRef) -> std::result::Result<Value, ToolError> {
        let registry = match self.agent.registry() {
            Some(r) => r,
            None => {
                return Err(ToolError {
                    tool_call_id: call.id.clone(),
                    server_name: "unknown".to_string(),
                    tool_name: call.name.clone(),
                    error: "no tool registry configured for this agent".to_string(),
                })
            }
        };

        let server_name = match registry.find_server_of_tool(&call.name).await {
            Some(name) => name,
            None => {
                return Err(ToolError {
                    tool_call_id: call.id.clone(),
                    server_name: "unknown".to_string(),
                    tool_name: call.name.clone(),
                    error: format!("no connected server advertises tool '{}'", call.name),
                })
            }
        };

        let client = match registry.get_client(&server_name) {
            Some(c) => c,
            None => {
                return Err(ToolError {
                    tool_call_id: call.id.clone(),
                    server_name: server_name.clone(),
                    tool_name: call.name.clone(),
                    error: "server resolved but no client registered".to_string(),
                })
            }
        };

        match client.call_tool(&call.name, call.arguments.clone()).await {
            Ok(result) => {
                self.agent.transcript_mut().record_invocation(server_name, call.name.clone(), call.arguments.clone(), result.clone());
                Ok(result)
            }
            Err(e) => Err(ToolError {
                tool_call_id: call.id.clone(),
                server_name,
                tool_name: call.name.clone(),
                error: e.to_string(),
            }),
        }
    }
}
