// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! LLM provider bindings are an external collaborator (spec §1), so the core
//! carries only the `LlmProvider` seam and this canned stand-in — the same
//! treatment `MockLocalTool` gives out-of-scope concrete tool
//! implementations. A real binding (Ollama, OpenAI, Anthropic, ...) is wired
//! in by the integrator, not built here.

use async_trait::async_trait;

use crate::domain::llm::{FinishReason, GenerationOptions, GenerationResponse, LlmError, LlmProvider, TokenUsage};

pub struct MockLlmProvider {
    pub canned_response: String,
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
        Ok(GenerationResponse {
            text: self.canned_response.clone(),
            usage: TokenUsage::default(),
            provider: "mock".to_string(),
            model: "mock".to_string(),
            finish_reason: FinishReason::Stop,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}
