// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error talking to LLM provider: {0}")]
    Network(String),
    #[error("authentication failed for LLM provider '{0}'")]
    Authentication(String),
    #[error("rate limited by LLM provider '{provider}', retry after {retry_after_secs:?}s")]
    RateLimit {
        provider: String,
        retry_after_secs: Option<u64>,
    },
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.2,
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub provider: String,
    pub model: String,
    pub finish_reason: FinishReason,
}

/// Text-in/text-out oracle. An explicit context value threaded into
/// activities rather than a process-wide singleton (design note in spec §9):
/// `ReactStep` and `ExtractFinal` both take `&dyn LlmProvider`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LlmError>;

    async fn health_check(&self) -> Result<(), LlmError>;
}
