// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! LLM provider registry: resolves the configured default provider by name
//! from a caller-supplied map of already-constructed bindings. Provider
//! construction and any retry/fallback orchestration belong to the binding
//! itself, an external collaborator (spec §1) — `call_llm_with_retry` in the
//! activities module already owns retry at the durable-unit level, so the
//! registry does not duplicate it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::llm::{GenerationOptions, GenerationResponse, LlmError, LlmProvider};

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default_provider: String,
}

impl ProviderRegistry {
    pub fn new(providers: HashMap<String, Arc<dyn LlmProvider>>, default_provider: impl Into<String>) -> Self {
        Self { providers, default_provider: default_provider.into() }
    }

    fn default(&self) -> Result<&Arc<dyn LlmProvider>, LlmError> {
        self.providers
            .get(&self.default_provider)
            .ok_or_else(|| LlmError::Provider(format!("provider '{}' not configured", self.default_provider)))
    }

    pub async fn health_check_all(&self) -> HashMap<String, Result<(), LlmError>> {
        let mut results = HashMap::new();
        for (name, provider) in &self.providers {
            results.insert(name.clone(), provider.health_check().await);
        }
        results
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

#[async_trait::async_trait]
impl LlmProvider for ProviderRegistry {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
        self.default()?.generate(prompt, options).await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        self.default()?.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::mock_provider::MockLlmProvider;

    #[test]
    fn unconfigured_default_provider_is_absent() {
        let registry = ProviderRegistry::new(HashMap::new(), "bogus");
        assert!(!registry.has_provider("bogus"));
    }

    #[tokio::test]
    async fn resolves_and_calls_the_named_default_provider() {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("default".to_string(), Arc::new(MockLlmProvider { canned_response: "hi".to_string() }));
        let registry = ProviderRegistry::new(providers, "default");
        let response = registry.generate("prompt", &GenerationOptions::default()).await.unwrap();
        assert_eq!(response.text, "hi");
    }

    #[tokio::test]
    async fn generate_fails_when_default_provider_missing() {
        let registry = ProviderRegistry::new(HashMap::new(), "missing");
        let err = registry.generate("prompt", &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::Provider(_)));
    }
}
