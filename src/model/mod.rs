//! The model-facing boundary.
//!
//! A `ModelClient` is the agent's access to a language model: it turns a
//! serialized transcript plus an optional tool menu into a `ModelResponse`.
//! Grounded on `dirmacs-ares::llm::client::LLMClient` for the trait shape
//! (`name`, a `generate_with_tools`-equivalent entry point) generalized to
//! the harness's single `chat_complete` contract (§6).

#[cfg(feature = "openai")]
pub mod openai;

use crate::error::Result;
use crate::transcript::{ModelMessage, ToolCallRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of the tool menu passed to `ModelClient::chat_complete`: a JSON
/// Schema function envelope, per §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ModelToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ModelTool {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: ModelToolFunction { name: name.into(), description: description.into(), parameters },
        }
    }
}

/// Token usage reported by a model call, if the adapter tracks it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// The model's reply to one `chat_complete` call.
///
/// Contract: `tool_calls` non-empty implies the Host must execute them;
/// `tool_calls` empty with non-null `content` implies a candidate final
/// answer.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRef>,
    pub finish_reason: String,
    pub usage: Option<TokenUsage>,
}

/// The boundary a concrete language-model adapter must satisfy.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Adapter/provider display name, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// The concrete model identifier this client was configured with, if any.
    fn default_model(&self) -> Option<&str>;

    /// Whether this adapter can accept a non-empty `tools` argument.
    fn supports_tools(&self) -> bool {
        true
    }

    /// Complete a chat turn, optionally offering a tool menu.
    async fn chat_complete(&self, messages: &[ModelMessage], tools: Option<&[ModelTool]>) -> Result<ModelResponse>;
}
