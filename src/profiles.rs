//! Provider-profile resolution: defaults → role override (exact or
//! dotted-prefix) → model variant lookup → environment variable
//! resolution.
//!
//! Grounded field-for-field on `lev/llm_config_loader.py`'s
//! `ProviderProfile`/`RoleConfig`/`LLMConfig`/`get_llm_config`, translated
//! from pydantic-style dataclasses into serde structs and a resolver
//! function with the same search order and merge rules.

use crate::error::{HarnessError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Default,
    Reasoning,
    Fast,
}

impl Default for ModelVariant {
    fn default() -> Self {
        ModelVariant::Default
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMapping {
    pub default: String,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub fast: Option<String>,
}

impl ModelMapping {
    pub fn get_model(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::Default => &self.default,
            ModelVariant::Reasoning => self.reasoning.as_deref().unwrap_or(&self.default),
            ModelVariant::Fast => self.fast.as_deref().unwrap_or(&self.default),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: String,
    pub models: ModelMapping,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub endpoint_env: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// A fully resolved `(model, api_key, base_url)` triple ready to construct a
/// `ModelClient` with.
#[derive(Debug, Clone)]
pub struct ResolvedModelConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub parameters: ModelParameters,
}

impl ProviderProfile {
    /// Resolve environment variables. Azure-style profiles (provider ==
    /// "azure") tolerate a missing api key env var, since azure deployments
    /// are sometimes authenticated via managed identity instead.
    fn get_runtime_config(&self, variant: ModelVariant, parameters: ModelParameters) -> Result<ResolvedModelConfig> {
        let api_key = match &self.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(value) => Some(value),
                Err(_) if self.provider.eq_ignore_ascii_case("azure") => None,
                Err(_) => {
                    return Err(HarnessError::Configuration(format!(
                        "environment variable '{var}' for provider '{}' is not set",
                        self.provider
                    )))
                }
            },
            None => None,
        };

        let base_url = match &self.endpoint_env {
            Some(var) => std::env::var(var).ok(),
            None => self.base_url.clone(),
        };

        Ok(ResolvedModelConfig {
            provider: self.provider.clone(),
            model: self.models.get_model(variant).to_string(),
            api_key,
            base_url,
            api_version: self.api_version.clone(),
            parameters,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub presence_penalty: Option<f64>,
}

fn default_temperature() -> f64 {
    1.0
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self { temperature: default_temperature(), max_tokens: None, top_p: None, frequency_penalty: None, presence_penalty: None }
    }
}

impl ModelParameters {
    /// `other` takes priority field-by-field; fields `other` leaves at the
    /// default are filled in from `self`.
    pub fn merge(&self, other: &ModelParameters) -> ModelParameters {
        ModelParameters {
            temperature: other.temperature,
            max_tokens: other.max_tokens.or(self.max_tokens),
            top_p: other.top_p.or(self.top_p),
            frequency_penalty: other.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: other.presence_penalty.or(self.presence_penalty),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub model_variant: ModelVariant,
    #[serde(default)]
    pub model_parameters: ModelParameters,
    #[serde(default)]
    pub persona: Option<String>,
}

impl RoleConfig {
    pub fn merge(&self, other: &RoleConfig) -> RoleConfig {
        RoleConfig {
            model_variant: other.model_variant,
            model_parameters: self.model_parameters.merge(&other.model_parameters),
            persona: other.persona.clone().or_else(|| self.persona.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub active_profile: String,
    #[serde(default)]
    pub defaults: RoleConfig,
    /// Keyed by role, or by a dotted `"{role}.{variant}"` sub-role. Kept as
    /// an `IndexMap` (not a `HashMap`) so the manifest's declared key order
    /// is preserved — `role_config_for`'s dotted-prefix scan must be
    /// deterministic, matching the original's dict-iteration-order
    /// "first match wins" behavior.
    #[serde(default)]
    pub overrides: IndexMap<String, RoleConfig>,
}

/// Loads `provider_profiles.json` from the search path, and resolves a
/// role's `LlmConfig` against the active profile.
pub struct ProfileStore {
    profiles: HashMap<String, ProviderProfile>,
}

impl ProfileStore {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit_path)?;
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            HarnessError::Configuration(format!("failed to read provider profiles at {}: {e}", path.display()))
        })?;
        let profiles: HashMap<String, ProviderProfile> = serde_json::from_str(&raw)?;
        Ok(Self { profiles })
    }

    fn resolve_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(p) = explicit_path {
            return Ok(p.to_path_buf());
        }
        if let Ok(p) = std::env::var("EVAL_PROFILES_PATH") {
            return Ok(PathBuf::from(p));
        }
        let cwd_candidate = PathBuf::from("provider_profiles.json");
        if cwd_candidate.exists() {
            return Ok(cwd_candidate);
        }
        if let Some(home) = dirs_home() {
            let home_candidate = home.join(".config/eval/provider_profiles.json");
            if home_candidate.exists() {
                return Ok(home_candidate);
            }
        }
        Err(HarnessError::Configuration(
            "no provider_profiles.json found in EVAL_PROFILES_PATH, ./provider_profiles.json, or ~/.config/eval/provider_profiles.json".to_string(),
        ))
    }

    pub fn profile(&self, name: &str) -> Option<&ProviderProfile> {
        self.profiles.get(name)
    }

    /// Resolve `role` against `config`: exact match on the overrides map
    /// first, then the first override key prefixed `"{role}."` in map
    /// order (e.g. role `"solver"` matches an override keyed
    /// `"solver.reasoning"`), then `config.defaults`.
    pub fn resolve(&self, config: &LlmConfig, role: &str, variant_override: Option<ModelVariant>) -> Result<ResolvedModelConfig> {
        let profile = self.profile(&config.active_profile).ok_or_else(|| {
            HarnessError::Configuration(format!("no provider profile named '{}'", config.active_profile))
        })?;

        let role_config = Self::role_config_for(config, role);
        let variant = variant_override.unwrap_or(role_config.model_variant);
        profile.get_runtime_config(variant, role_config.model_parameters)
    }

    fn role_config_for(config: &LlmConfig, role: &str) -> RoleConfig {
        if let Some(exact) = config.overrides.get(role) {
            return config.defaults.merge(exact);
        }
        let prefix = format!("{role}.");
        if let Some((_, found)) = config.overrides.iter().find(|(key, _)| key.starts_with(&prefix)) {
            return config.defaults.merge(found);
        }
        config.defaults.clone()
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ProviderProfile {
        ProviderProfile {
            provider: "openai".to_string(),
            models: ModelMapping { default: "gpt-4o".to_string(), reasoning: Some("o1".to_string()), fast: None },
            api_key_env: None,
            endpoint_env: None,
            api_version: None,
            base_url: None,
            region: None,
        }
    }

    #[test]
    fn model_mapping_falls_back_to_default_for_unset_variant() {
        let mapping = ModelMapping { default: "gpt-4o".to_string(), reasoning: None, fast: None };
        assert_eq!(mapping.get_model(ModelVariant::Fast), "gpt-4o");
    }

    #[test]
    fn role_config_exact_override_wins() {
        let config = LlmConfig {
            active_profile: "p".to_string(),
            defaults: RoleConfig { model_variant: ModelVariant::Default, ..Default::default() },
            overrides: IndexMap::from([(
                "judge".to_string(),
                RoleConfig { model_variant: ModelVariant::Reasoning, ..Default::default() },
            )]),
        };
        let resolved = ProfileStore::role_config_for(&config, "judge");
        assert_eq!(resolved.model_variant as u8, ModelVariant::Reasoning as u8);
    }

    #[test]
    fn role_config_dotted_override_matches_plain_role_query() {
        // Querying the plain role "solver" must be able to resolve a
        // dotted override keyed "solver.reasoning" — the direction
        // `build_provider_registry` actually queries in.
        let config = LlmConfig {
            active_profile: "p".to_string(),
            defaults: RoleConfig::default(),
            overrides: IndexMap::from([(
                "solver.reasoning".to_string(),
                RoleConfig { model_variant: ModelVariant::Reasoning, ..Default::default() },
            )]),
        };
        let resolved = ProfileStore::role_config_for(&config, "solver");
        assert_eq!(resolved.model_variant as u8, ModelVariant::Reasoning as u8);
    }

    #[test]
    fn role_config_dotted_override_ignored_for_unrelated_role() {
        let config = LlmConfig {
            active_profile: "p".to_string(),
            defaults: RoleConfig::default(),
            overrides: IndexMap::from([(
                "solver.reasoning".to_string(),
                RoleConfig { model_variant: ModelVariant::Reasoning, ..Default::default() },
            )]),
        };
        let resolved = ProfileStore::role_config_for(&config, "judge");
        assert_eq!(resolved.model_variant as u8, ModelVariant::Default as u8);
    }

    #[test]
    fn azure_profile_tolerates_missing_api_key() {
        let mut p = profile();
        p.provider = "azure".to_string();
        p.api_key_env = Some("__LEV_TEST_UNSET_VAR__".to_string());
        let resolved = p.get_runtime_config(ModelVariant::Default, ModelParameters::default()).unwrap();
        assert!(resolved.api_key.is_none());
    }
}
