//! `ToolAgent` — a stateful per-conversation holder of a `ModelClient`, a
//! system prompt, and (optionally) a `ToolRegistry`. Owns a `ChatTranscript`.
//!
//! Grounded on `crates/pawan::agent::PawanAgent`'s field shape (`history`,
//! `system_prompt`, `tools`); the control flow is rewritten per §4.4, since
//! pawan's `execute_with_callbacks` fuses propose+execute+rewrite into one
//! loop, while this agent exposes only the single `propose` step — the Host
//! owns the loop and decides how to write the response back.

use crate::error::Result;
use crate::mcp::ToolRegistry;
use crate::model::{ModelClient, ModelResponse, ModelTool};
use crate::transcript::{ChatTranscript, Role};
use std::sync::Arc;

pub struct ToolAgent {
    model: Arc<dyn ModelClient>,
    system_prompt: String,
    registry: Option<Arc<ToolRegistry>>,
    transcript: ChatTranscript,
}

impl ToolAgent {
    pub fn new(model: Arc<dyn ModelClient>, system_prompt: impl Into<String>) -> Self {
        let mut agent = Self { model, system_prompt: system_prompt.into(), registry: None, transcript: ChatTranscript::new() };
        agent.transcript.append_system(agent.system_prompt.clone());
        agent
    }

    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut ChatTranscript {
        &mut self.transcript
    }

    pub fn registry(&self) -> Option<&Arc<ToolRegistry>> {
        self.registry.as_ref()
    }

    /// Eagerly connect all tool clients through the registry.
    pub async fn initialize(&self) {
        if let Some(registry) = &self.registry {
            registry.connect_all().await;
        }
    }

    /// Disconnect all tool clients.
    pub async fn cleanup(&self) {
        if let Some(registry) = &self.registry {
            registry.disconnect_all().await;
        }
    }

    /// Clear the transcript and re-seed the system message.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.transcript.append_system(self.system_prompt.clone());
    }

    /// Append `prompt` with `role`, call the model, and return its raw
    /// response without mutating the transcript any further. The caller
    /// (the Host) decides how the assistant's reply gets written back.
    pub async fn propose(&mut self, prompt: &str, role: Role) -> Result<ModelResponse> {
        self.append_prompt(prompt, role);
        self.invoke_model(None).await
    }

    /// Re-invoke the model against the existing transcript without adding a
    /// new prompt — used by `Host::step` after tool responses have been
    /// appended as the next stimulus.
    pub async fn propose_with_existing_messages(&mut self) -> Result<ModelResponse> {
        self.invoke_model(None).await
    }

    fn append_prompt(&mut self, prompt: &str, role: Role) {
        match role {
            Role::User => self.transcript.append_user(prompt),
            Role::Developer => self.transcript.append_developer(prompt),
            Role::System => self.transcript.append_system(prompt),
            Role::Assistant | Role::Tool | Role::Platform => self.transcript.append_user(prompt),
        }
    }

    async fn invoke_model(&mut self, tools: Option<Vec<ModelTool>>) -> Result<ModelResponse> {
        let tools = match tools {
            Some(t) => Some(t),
            None => match &self.registry {
                Some(registry) => {
                    let specs = registry.gather_specs().await;
                    if specs.is_empty() {
                        None
                    } else {
                        Some(
                            specs
                                .into_iter()
                                .map(|s| ModelTool::function(s.name, s.description, s.parameters_schema))
                                .collect(),
                        )
                    }
                }
                None => None,
            },
        };

        let messages = self.transcript.to_model_messages(true, true);
        self.model.chat_complete(&messages, tools.as_deref()).await
    }
}
