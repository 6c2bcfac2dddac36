//! Eval manifest: the JSON document describing which MCP servers to run,
//! which questions to ask, and how to score the answers.
//!
//! Grounded on `lev/manifest.py`'s `EvalManifest`/`ResolvedEvalManifest`
//! dataclasses; validation rules per §4.10.

use crate::error::{HarnessError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// The only manifest `type` this harness understands.
pub const MANIFEST_TYPE: &str = "mcp_eval";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub suppress_output: bool,
}

/// A per-tool call-count requirement. `exact`, when set, overrides `min`
/// and `max`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallCountConstraint {
    #[serde(default)]
    pub exact: Option<usize>,
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

/// How a `ToolCallInputScorer` field constraint's `value` is compared
/// against the actual argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMatchMode {
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub field: String,
    pub value: serde_json::Value,
    #[serde(default = "default_match_mode")]
    pub mode: FieldMatchMode,
}

fn default_match_mode() -> FieldMatchMode {
    FieldMatchMode::Exact
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_ignore_extra() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScorerConfig {
    LlmCritique { weight: f64, #[serde(default)] role: Option<String> },
    LlmExtractValue { weight: f64, expected: serde_json::Value, #[serde(default)] role: Option<String> },
    ContainsString { weight: f64, target: String, #[serde(default)] case_sensitive: bool },
    /// Per-tool invocation counts. `calls` is kept as an `IndexMap` so
    /// `order_matters` can check the declared tools' first-occurrence order
    /// against the manifest's own key order.
    ToolCallCount {
        weight: f64,
        calls: IndexMap<String, CallCountConstraint>,
        #[serde(default)]
        order_matters: bool,
    },
    /// Per-tool field constraints checked against that tool's first
    /// invocation.
    ToolCallInput { weight: f64, inputs: HashMap<String, Vec<FieldConstraint>> },
    /// Per-tool expected-result fragments, compared structurally against
    /// that tool's first invocation's result.
    ToolCallOutput {
        weight: f64,
        results: HashMap<String, serde_json::Value>,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_ignore_extra")]
        ignore_extra: bool,
    },
}

impl ScorerConfig {
    pub fn weight(&self) -> f64 {
        match self {
            ScorerConfig::LlmCritique { weight, .. }
            | ScorerConfig::LlmExtractValue { weight, .. }
            | ScorerConfig::ContainsString { weight, .. }
            | ScorerConfig::ToolCallCount { weight, .. }
            | ScorerConfig::ToolCallInput { weight, .. }
            | ScorerConfig::ToolCallOutput { weight, .. } => *weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSpec {
    /// Role the question is sent under; defaults to "solver".
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub max_steps: Option<usize>,
}

fn default_role() -> String {
    "solver".to_string()
}

impl Default for ExecutionSpec {
    fn default() -> Self {
        Self { role: default_role(), max_steps: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eval {
    pub id: String,
    pub question: String,
    /// Server names (from the manifest's top-level `mcps`) this eval is
    /// allowed to use. Validated against the manifest's `mcps` keys.
    #[serde(default)]
    pub mcps: Vec<String>,
    #[serde(default)]
    pub execution: ExecutionSpec,
    #[serde(default)]
    pub scoring: Vec<ScorerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    #[serde(rename = "type")]
    pub manifest_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub llm_config: Option<serde_json::Value>,
    #[serde(default)]
    pub mcps: HashMap<String, ToolServerConfig>,
    pub evals: Vec<Eval>,
    #[serde(default)]
    pub logging: Option<serde_json::Value>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        reject_legacy_fields(&value)?;
        let manifest: Manifest = serde_json::from_value(value)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest_type != MANIFEST_TYPE {
            return Err(HarnessError::Manifest(format!(
                "unsupported manifest type '{}', expected '{MANIFEST_TYPE}'",
                self.manifest_type
            )));
        }
        if self.evals.is_empty() {
            return Err(HarnessError::Manifest("manifest defines no evals".to_string()));
        }
        for eval in &self.evals {
            for server in &eval.mcps {
                if !self.mcps.contains_key(server) {
                    return Err(HarnessError::Manifest(format!(
                        "eval '{}' references undeclared mcp server '{server}'",
                        eval.id
                    )));
                }
            }
            for scorer in &eval.scoring {
                if scorer.weight() < 0.0 {
                    return Err(HarnessError::Manifest(format!(
                        "eval '{}' has a scorer with negative weight",
                        eval.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Legacy top-level fields from the superseded single-file manifest format
/// are rejected outright rather than silently ignored, so a stale manifest
/// fails loudly instead of running with a subtly different meaning. These
/// are the `solver`/`asker`/`judge`/`model_config` blocks that used to sit
/// parallel to `llm_config` before provider profiles existed.
fn reject_legacy_fields(value: &serde_json::Value) -> Result<()> {
    const LEGACY_FIELDS: &[&str] = &["solver", "asker", "judge", "model_config"];
    if let serde_json::Value::Object(obj) = value {
        for field in LEGACY_FIELDS {
            if obj.contains_key(*field) {
                return Err(HarnessError::Manifest(format!(
                    "manifest uses legacy field '{field}', which is no longer supported — migrate to 'llm_config'"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "schema_version": "1",
            "type": "mcp_eval",
            "mcps": {
                "files": {"name": "files", "command": "files-server"}
            },
            "evals": [
                {
                    "id": "e1",
                    "question": "what files exist?",
                    "mcps": ["files"],
                    "scoring": [{"type": "contains_string", "weight": 1.0, "target": "ok"}]
                }
            ]
        })
    }

    #[test]
    fn valid_manifest_parses() {
        let manifest: Manifest = serde_json::from_value(sample()).unwrap();
        manifest.validate().unwrap();
    }

    #[test]
    fn dangling_mcp_reference_is_rejected() {
        let mut value = sample();
        value["evals"][0]["mcps"] = serde_json::json!(["nonexistent"]);
        let manifest: Manifest = serde_json::from_value(value).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn legacy_field_is_rejected() {
        let mut value = sample();
        value["solver"] = serde_json::json!({"provider": "openai", "model": "gpt-4o"});
        assert!(reject_legacy_fields(&value).is_err());
    }

    #[test]
    fn legacy_model_config_field_is_rejected() {
        let mut value = sample();
        value["model_config"] = serde_json::json!({"temperature": 0.5});
        assert!(reject_legacy_fields(&value).is_err());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut value = sample();
        value["type"] = serde_json::json!("something_else");
        let manifest: Manifest = serde_json::from_value(value).unwrap();
        assert!(manifest.validate().is_err());
    }
}
