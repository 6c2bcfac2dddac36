//! The append-only conversation log shared by every agent.
//!
//! `ChatTranscript` is the one place a conversation is serialized both for
//! the model (`toModelMessages`) and for human/LLM consumption
//! (`renderTrace`). Grounded on `lev.core.chat_history.ChatHistory`:
//! `renderTrace`'s line format follows `render_trace` there verbatim,
//! including the continuation indent and the excluded-token-count preview
//! suffix, and its silence on any role besides user/assistant/tool — a
//! developer nudge leaves no trace line and does not reset the in-progress
//! assistant block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation role, distinguishing the Introspector's nudges (`Developer`)
/// from ordinary user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Developer,
    Platform,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Developer => "developer",
            Role::Platform => "platform",
        }
    }
}

/// A tool-call request attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRef {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// One completed tool invocation, kept separately from the message log so
/// scorers can reason over invocations structurally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub server_name: String,
    pub tool_name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
    pub result: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// An immutable, appended message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A message as serialized for `ModelClient::chat_complete` — the one wire
/// shape the transcript is flattened to for the model-facing boundary (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Append-only conversation log plus an ordered tool-invocation log.
///
/// Invariants upheld by construction: every `tool_call_id` on a tool message
/// references an id from a preceding assistant message's `tool_calls`;
/// timestamps are nondecreasing; the system message, if present, is first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTranscript {
    messages: Vec<Message>,
    invocations: Vec<ToolInvocationRecord>,
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn invocations(&self) -> &[ToolInvocationRecord] {
        &self.invocations
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.invocations.clear();
    }

    pub fn append_system(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            role: Role::System,
            content: text.into(),
            timestamp: now(),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: text.into(),
            timestamp: now(),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    pub fn append_developer(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Developer,
            content: text.into(),
            timestamp: now(),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: text.into(),
            timestamp: now(),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    pub fn append_assistant_tool_call(&mut self, text: impl Into<String>, calls: Vec<ToolCallRef>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: text.into(),
            timestamp: now(),
            tool_calls: Some(calls),
            tool_call_id: None,
        });
    }

    pub fn append_tool_response(&mut self, call_id: impl Into<String>, payload_json: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Tool,
            content: payload_json.into(),
            timestamp: now(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        });
    }

    pub fn record_invocation(
        &mut self,
        server_name: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
        result: serde_json::Value,
    ) {
        self.invocations.push(ToolInvocationRecord {
            server_name: server_name.into(),
            tool_name: tool_name.into(),
            arguments,
            result,
            timestamp: now(),
        });
    }

    /// Render the conversation as a console-style trace. Mirrors
    /// `ChatHistory.render_trace` line for line.
    pub fn render_trace(&self, max_preview_len: usize) -> String {
        const CONT: &str = "          "; // fixed 10-space continuation indent
        let mut lines: Vec<String> = Vec::new();
        let mut assistant_block_active = false;

        for msg in &self.messages {
            match msg.role {
                Role::User => {
                    lines.push(format!("USER      → {}", msg.content));
                    assistant_block_active = false;
                }
                Role::Assistant => {
                    if let Some(calls) = &msg.tool_calls {
                        for call in calls {
                            let server = self.server_for_tool(&call.name).unwrap_or("unknown");
                            let args_str = call
                                .arguments
                                .iter()
                                .map(|(k, v)| format!("{k}=\"{}\"", render_value(v)))
                                .collect::<Vec<_>>()
                                .join(", ");
                            let line = if !assistant_block_active {
                                format!("ASSISTANT → [tool_call:{server}.{}]({args_str})", call.name)
                            } else {
                                format!("{CONT}[tool_call:{server}.{}]({args_str})", call.name)
                            };
                            lines.push(line);
                            assistant_block_active = true;
                        }
                    }
                    if !msg.content.is_empty() {
                        if assistant_block_active {
                            lines.push(format!("{CONT}💬 {}", msg.content));
                        } else {
                            lines.push(format!("ASSISTANT 💬 {}", msg.content));
                        }
                        assistant_block_active = false;
                    }
                }
                Role::Tool => {
                    let preview = truncate_preview(&msg.content, max_preview_len);
                    lines.push(format!("{CONT}← {preview}"));
                    // remains within the assistant block
                }
                Role::System | Role::Developer | Role::Platform => {}
            }
        }

        lines.join("\n")
    }

    fn server_for_tool(&self, tool_name: &str) -> Option<&str> {
        self.invocations
            .iter()
            .find(|inv| inv.tool_name == tool_name)
            .map(|inv| inv.server_name.as_str())
    }

    /// Serialize the transcript for the `ModelClient` boundary.
    pub fn to_model_messages(&self, with_system: bool, with_tools: bool) -> Vec<ModelMessage> {
        let mut out = Vec::with_capacity(self.messages.len());
        for msg in &self.messages {
            match msg.role {
                Role::User | Role::Assistant => {
                    out.push(ModelMessage {
                        role: msg.role,
                        content: Some(msg.content.clone()),
                        tool_calls: if with_tools { msg.tool_calls.clone() } else { None },
                        tool_call_id: None,
                    });
                }
                Role::Tool => {
                    if with_tools {
                        out.push(ModelMessage {
                            role: msg.role,
                            content: Some(msg.content.clone()),
                            tool_calls: None,
                            tool_call_id: msg.tool_call_id.clone(),
                        });
                    }
                }
                Role::System | Role::Developer | Role::Platform => {
                    if with_system {
                        out.push(ModelMessage {
                            role: msg.role,
                            content: Some(msg.content.clone()),
                            tool_calls: None,
                            tool_call_id: None,
                        });
                    }
                }
            }
        }
        out
    }

    /// Scan backward for the most recent assistant message with non-empty
    /// content. Used by `Workflow::ask` when the outer loop exhausts its
    /// step budget without a clean return.
    pub fn last_nonempty_assistant_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.as_str())
    }
}

fn render_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_preview(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let trimmed: String = text.chars().take(max_len).collect();
    let excluded = text.split_whitespace().count().saturating_sub(trimmed.split_whitespace().count());
    format!("{trimmed}... ({excluded} tokens excluded)")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn render_trace_plain_answer() {
        let mut t = ChatTranscript::new();
        t.append_system("be helpful");
        t.append_user("Say 'hi'.");
        t.append_assistant("hi");
        let trace = t.render_trace(100);
        assert_eq!(trace, "USER      → Say 'hi'.\nASSISTANT 💬 hi");
    }

    #[test]
    fn render_trace_tool_call_block() {
        let mut t = ChatTranscript::new();
        t.append_user("What is 2+3?");
        t.record_invocation("math", "add", args(&[("a", "2"), ("b", "3")]), serde_json::json!({"result": 5}));
        t.append_assistant_tool_call(
            "",
            vec![ToolCallRef {
                id: "call_1".into(),
                name: "add".into(),
                arguments: args(&[("a", "2"), ("b", "3")]),
            }],
        );
        t.append_tool_response("call_1", r#"{"result":5}"#);
        t.append_assistant("5");
        let trace = t.render_trace(100);
        assert!(trace.contains("ASSISTANT → [tool_call:math.add]"));
        assert!(trace.contains("← {\"result\":5}"));
        assert!(trace.ends_with("ASSISTANT 💬 5"));
    }

    #[test]
    fn to_model_messages_filters_tool_calls_without_tools() {
        let mut t = ChatTranscript::new();
        t.append_system("sys");
        t.append_user("hi");
        t.append_assistant_tool_call(
            "",
            vec![ToolCallRef { id: "1".into(), name: "x".into(), arguments: Default::default() }],
        );
        let without_tools = t.to_model_messages(true, false);
        assert!(without_tools.iter().all(|m| m.tool_calls.is_none()));
        let with_tools = t.to_model_messages(true, true);
        assert!(with_tools.iter().any(|m| m.tool_calls.is_some()));
    }

    #[test]
    fn timestamps_nondecreasing() {
        let mut t = ChatTranscript::new();
        t.append_user("a");
        t.append_assistant("b");
        let ts: Vec<_> = t.messages().iter().map(|m| m.timestamp).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
    }
}
