//! `LlmProviderRegistry` — a role-keyed map of `ModelClient`s with
//! fallback-to-solver semantics.
//!
//! Grounded on `lev/core/provider_registry.py::LlmProviderRegistry`'s shape
//! (`get_solver`/`get_judge`/`get_asker`/`get(role)`, all falling back to the
//! solver when a role has no dedicated client) and on
//! `dirmacs-ares::llm::provider_registry::ProviderRegistry`'s
//! `HashMap<String, Arc<dyn ModelClient>>` construction idiom.

use crate::error::{HarnessError, Result};
use crate::model::ModelClient;
use std::collections::HashMap;
use std::sync::Arc;

pub const SOLVER_ROLE: &str = "solver";
pub const JUDGE_ROLE: &str = "judge";
pub const ASKER_ROLE: &str = "asker";

pub struct LlmProviderRegistry {
    providers: HashMap<String, Arc<dyn ModelClient>>,
}

impl LlmProviderRegistry {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    pub fn register(&mut self, role: impl Into<String>, client: Arc<dyn ModelClient>) {
        self.providers.insert(role.into(), client);
    }

    pub fn roles(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.providers.contains_key(role)
    }

    pub fn get_solver(&self) -> Result<Arc<dyn ModelClient>> {
        self.providers
            .get(SOLVER_ROLE)
            .cloned()
            .ok_or_else(|| HarnessError::Configuration("no model client registered for the 'solver' role".to_string()))
    }

    pub fn get_judge(&self) -> Result<Arc<dyn ModelClient>> {
        self.get_with_fallback(JUDGE_ROLE)
    }

    pub fn get_asker(&self) -> Result<Arc<dyn ModelClient>> {
        self.get_with_fallback(ASKER_ROLE)
    }

    /// Look up `role` verbatim, falling back to the solver if no client was
    /// registered for it.
    pub fn get(&self, role: &str) -> Result<Arc<dyn ModelClient>> {
        self.get_with_fallback(role)
    }

    fn get_with_fallback(&self, role: &str) -> Result<Arc<dyn ModelClient>> {
        match self.providers.get(role) {
            Some(client) => Ok(client.clone()),
            None => self.get_solver(),
        }
    }
}

impl Default for LlmProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelResponse, ModelTool};
    use crate::transcript::ModelMessage;
    use async_trait::async_trait;

    struct StubClient(&'static str);

    #[async_trait]
    impl ModelClient for StubClient {
        fn name(&self) -> &str {
            self.0
        }
        fn default_model(&self) -> Option<&str> {
            Some("stub")
        }
        async fn chat_complete(&self, _messages: &[ModelMessage], _tools: Option<&[ModelTool]>) -> Result<ModelResponse> {
            Ok(ModelResponse { content: Some("ok".to_string()), tool_calls: vec![], finish_reason: "stop".to_string(), usage: None })
        }
    }

    #[test]
    fn missing_solver_is_an_error() {
        let registry = LlmProviderRegistry::new();
        assert!(registry.get_solver().is_err());
    }

    #[test]
    fn judge_falls_back_to_solver() {
        let mut registry = LlmProviderRegistry::new();
        registry.register(SOLVER_ROLE, Arc::new(StubClient("solver")));
        let judge = registry.get_judge().unwrap();
        assert_eq!(judge.name(), "solver");
    }

    #[test]
    fn dedicated_judge_is_preferred_over_fallback() {
        let mut registry = LlmProviderRegistry::new();
        registry.register(SOLVER_ROLE, Arc::new(StubClient("solver")));
        registry.register(JUDGE_ROLE, Arc::new(StubClient("judge")));
        assert_eq!(registry.get_judge().unwrap().name(), "judge");
    }
}
