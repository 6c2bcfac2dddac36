//! Normalization of raw MCP `call_tool` responses into the harness's
//! internal result shape.
//!
//! Implements §4.2's five-step algorithm verbatim, including the gated
//! error-prefix re-classification heuristic (`find_errors_in_content` in the
//! original source — preserved because scorers depend on the `success`
//! flag, gated behind `NormalizeConfig` per §9's open question).

use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Map, Value};

/// Configuration for the normalization heuristics.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    /// Re-classify a normalized `content` string beginning (case-
    /// insensitively) with the literal token `"error"` as a failure.
    pub detect_error_prefix: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { detect_error_prefix: true }
    }
}

/// Turn a raw MCP tool result into `{ success, result | content | error }`.
pub fn normalize_tool_result(raw: &CallToolResult, config: NormalizeConfig) -> Value {
    let normalized = normalize_inner(raw);
    apply_error_heuristic(normalized, config)
}

fn normalize_inner(raw: &CallToolResult) -> Value {
    if let Some(structured) = &raw.structured_content {
        if !is_empty_value(structured) {
            let result = structured.get("result").cloned().unwrap_or_else(|| structured.clone());
            return success(result);
        }
    }

    let text_blocks: Vec<String> = raw
        .content
        .iter()
        .flatten()
        .filter_map(|block| match &block.raw {
            RawContent::Text(text) => Some(text.text.clone()),
            _ => None,
        })
        .collect();

    match text_blocks.as_slice() {
        [] => {
            let mut map = Map::new();
            map.insert("success".to_string(), Value::Bool(false));
            map.insert("error".to_string(), Value::String("No response from server".to_string()));
            Value::Object(map)
        }
        [single] => normalize_single_text(single),
        many => {
            let parsed: Vec<Value> =
                many.iter().map(|text| serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))).collect();
            success(Value::Array(parsed))
        }
    }
}

fn normalize_single_text(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut obj)) => {
            if !obj.contains_key("success") {
                obj.insert("success".to_string(), Value::Bool(true));
            }
            Value::Object(obj)
        }
        Ok(Value::Array(arr)) => success(Value::Array(arr)),
        Ok(other) => success(other),
        Err(_) => {
            let mut map = Map::new();
            map.insert("content".to_string(), Value::String(text.to_string()));
            map.insert("success".to_string(), Value::Bool(true));
            Value::Object(map)
        }
    }
}

fn success(result: Value) -> Value {
    let mut map = Map::new();
    map.insert("success".to_string(), Value::Bool(true));
    map.insert("result".to_string(), result);
    Value::Object(map)
}

fn is_empty_value(v: &Map<String, Value>) -> bool {
    v.is_empty()
}

fn apply_error_heuristic(mut normalized: Value, config: NormalizeConfig) -> Value {
    if !config.detect_error_prefix {
        return normalized;
    }
    if let Value::Object(obj) = &mut normalized {
        let content_str = obj.get("content").and_then(Value::as_str).map(str::to_string);
        if let Some(content) = content_str {
            if content.to_lowercase().starts_with("error") {
                obj.insert("success".to_string(), Value::Bool(false));
                obj.insert("error".to_string(), Value::String(content));
                obj.remove("content");
            }
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::{Content, RawTextContent};

    fn text_result(texts: &[&str]) -> CallToolResult {
        CallToolResult {
            content: Some(
                texts
                    .iter()
                    .map(|t| Content::text(t.to_string()))
                    .collect(),
            ),
            structured_content: None,
            is_error: None,
        }
    }

    #[test]
    fn single_json_object_gets_success_injected() {
        let raw = text_result(&[r#"{"value": 5}"#]);
        let normalized = normalize_tool_result(&raw, NormalizeConfig::default());
        assert_eq!(normalized["success"], Value::Bool(true));
        assert_eq!(normalized["value"], Value::from(5));
    }

    #[test]
    fn single_json_array_is_wrapped() {
        let raw = text_result(&[r#"[1,2,3]"#]);
        let normalized = normalize_tool_result(&raw, NormalizeConfig::default());
        assert_eq!(normalized["success"], Value::Bool(true));
        assert_eq!(normalized["result"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn non_json_text_wrapped_as_content() {
        let raw = text_result(&["plain text"]);
        let normalized = normalize_tool_result(&raw, NormalizeConfig::default());
        assert_eq!(normalized["content"], Value::String("plain text".to_string()));
    }

    #[test]
    fn empty_result_is_failure() {
        let raw = text_result(&[]);
        let normalized = normalize_tool_result(&raw, NormalizeConfig::default());
        assert_eq!(normalized["success"], Value::Bool(false));
    }

    #[test]
    fn error_prefix_heuristic_reclassifies() {
        let raw = text_result(&["error: no such file"]);
        let normalized = normalize_tool_result(&raw, NormalizeConfig::default());
        assert_eq!(normalized["success"], Value::Bool(false));
        assert_eq!(normalized["error"], Value::String("error: no such file".to_string()));
    }

    #[test]
    fn error_prefix_heuristic_can_be_disabled() {
        let raw = text_result(&["error: no such file"]);
        let cfg = NormalizeConfig { detect_error_prefix: false };
        let normalized = normalize_tool_result(&raw, cfg);
        assert_eq!(normalized["success"], Value::Bool(true));
    }
}
