//! Reference `ModelClient` adapter against OpenAI-compatible chat completion
//! endpoints.
//!
//! Grounded on `dirmacs-ares::llm::openai::OpenAIClient`: the
//! `CreateChatCompletionRequestArgs` builder pattern, the tool-conversion
//! helper, and the tool-call extraction from
//! `ChatCompletionMessageToolCalls::Function` are all carried over, adapted
//! from `dirmacs-ares`'s `LLMClient` trait to this crate's `ModelClient`
//! contract.

use crate::error::{HarnessError, Result};
use crate::model::{ModelClient, ModelResponse, ModelTool, TokenUsage};
use crate::transcript::{ModelMessage, Role, ToolCallRef};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;

/// Parameters applied to every completion request from this client.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self { temperature: Some(1.0), max_tokens: None, top_p: None, frequency_penalty: None, presence_penalty: None }
    }
}

pub struct OpenAiModelClient {
    client: Client<OpenAIConfig>,
    model: String,
    params: ModelParams,
}

impl OpenAiModelClient {
    pub fn new(api_key: &str, api_base: Option<&str>, model: impl Into<String>, params: ModelParams) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        Self { client: Client::with_config(config), model: model.into(), params }
    }

    fn convert_message(msg: &ModelMessage) -> Result<ChatCompletionRequestMessage> {
        let content = msg.content.clone().unwrap_or_default();
        let built = match msg.role {
            Role::System | Role::Developer | Role::Platform => {
                // OpenAI's chat API has no "developer"/"platform" role; nudges
                // and reserved-role messages are folded into a system message
                // so they still shape context without masquerading as the user.
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(content)
                    .build()
                    .map(ChatCompletionRequestMessage::System)
            }
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map(ChatCompletionRequestMessage::User),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                builder.content(content);
                if let Some(calls) = &msg.tool_calls {
                    builder.tool_calls(
                        calls
                            .iter()
                            .map(|c| async_openai::types::ChatCompletionMessageToolCall {
                                id: c.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: async_openai::types::FunctionCall {
                                    name: c.name.clone(),
                                    arguments: serde_json::Value::Object(c.arguments.clone()).to_string(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                builder.build().map(ChatCompletionRequestMessage::Assistant)
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(content)
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .build()
                .map(ChatCompletionRequestMessage::Tool),
        };
        built.map_err(|e| HarnessError::Model(format!("failed to build chat message: {e}")))
    }

    fn convert_tool(tool: &ModelTool) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.function.name.clone(),
                description: Some(tool.function.description.clone()),
                parameters: Some(tool.function.parameters.clone()),
                strict: None,
            },
        }
    }

    fn extract_tool_calls(message: &async_openai::types::ChatCompletionResponseMessage) -> Vec<ToolCallRef> {
        message
            .tool_calls
            .iter()
            .flatten()
            .filter_map(|call| {
                let arguments: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(&call.function.arguments).unwrap_or_default();
                Some(ToolCallRef { id: call.id.clone(), name: call.function.name.clone(), arguments })
            })
            .collect()
    }
}

#[async_trait]
impl ModelClient for OpenAiModelClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn chat_complete(&self, messages: &[ModelMessage], tools: Option<&[ModelTool]>) -> Result<ModelResponse> {
        let converted: Vec<ChatCompletionRequestMessage> =
            messages.iter().map(Self::convert_message).collect::<Result<_>>()?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(converted);
        if let Some(t) = self.params.temperature {
            request.temperature(t);
        }
        if let Some(mt) = self.params.max_tokens {
            request.max_tokens(mt);
        }
        if let Some(tp) = self.params.top_p {
            request.top_p(tp);
        }
        if let Some(fp) = self.params.frequency_penalty {
            request.frequency_penalty(fp);
        }
        if let Some(pp) = self.params.presence_penalty {
            request.presence_penalty(pp);
        }
        if let Some(tools) = tools {
            if !tools.is_empty() {
                request.tools(tools.iter().map(Self::convert_tool).collect::<Vec<_>>());
            }
        }

        let request = request.build().map_err(|e| HarnessError::Model(format!("failed to build request: {e}")))?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| HarnessError::Model(format!("chat completion request failed: {e}")))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| HarnessError::Model("model returned no choices".to_string()))?;

        let tool_calls = Self::extract_tool_calls(&choice.message);
        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        Ok(ModelResponse {
            content: choice.message.content.clone(),
            tool_calls,
            finish_reason: format!("{:?}", choice.finish_reason).to_lowercase(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_conversion_preserves_schema() {
        let tool = ModelTool::function("add", "adds two numbers", serde_json::json!({"type": "object"}));
        let converted = OpenAiModelClient::convert_tool(&tool);
        assert_eq!(converted.function.name, "add");
        assert_eq!(converted.function.parameters, Some(serde_json::json!({"type": "object"})));
    }

    #[test]
    fn client_creation_does_not_panic() {
        let client = OpenAiModelClient::new("sk-test", None, "gpt-4o-mini", ModelParams::default());
        assert_eq!(client.default_model(), Some("gpt-4o-mini"));
        assert_eq!(client.name(), "openai");
    }
}
