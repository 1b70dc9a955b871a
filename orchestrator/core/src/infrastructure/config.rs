// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Worker startup configuration (C7), parsed from the environment variable
//! table in the external interfaces section. Construction order at startup:
//! config -> tracing -> LLM provider registry -> tool registry -> engine.

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(String),
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct WorkflowEngineConfig {
    pub temporal_host: String,
    pub temporal_namespace: String,
    pub task_queue: String,
}

/// Configuration for an LLM binding, an external collaborator (spec §1) —
/// carried here only so it can be read and handed to whatever binding the
/// integrator wires in; the core itself never constructs a provider from it.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub default_model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub provider_type: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct McpConfig {
    pub url: Option<String>,
    pub use_proxy: bool,
}

impl McpConfig {
    /// The effective tool-name resolution mode for the configured routing:
    /// prefixed under a mounting proxy, bare when connecting directly.
    pub fn tool_name_resolution(&self) -> crate::domain::mcp::ToolNameResolution {
        if self.use_proxy {
            crate::domain::mcp::ToolNameResolution::ProxyMounted
        } else {
            crate::domain::mcp::ToolNameResolution::Direct
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub mock: bool,
    pub tool_set: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: WorkflowEngineConfig,
    pub llm: LlmConfig,
    pub mcp: McpConfig,
    pub tools: ToolConfig,
}

/// Default task queue name from the external contract; retained even though
/// no real Temporal server is wired (see the durable-workflow-engine design
/// note), as the logical name the in-process engine registers work under.
pub const DEFAULT_TASK_QUEUE: &str = "durable-ai-agent-tasks";

impl AppConfig {
    pub fn from_env() -> Self {
        let provider_type = env_or("LLM_PROVIDER", "ollama");
        let api_key_var = format!("{}_API_KEY", provider_type.to_uppercase());
        let model_var = format!("{}_MODEL", provider_type.to_uppercase());

        Self {
            engine: WorkflowEngineConfig {
                temporal_host: env_or("TEMPORAL_HOST", "localhost:7233"),
                temporal_namespace: env_or("TEMPORAL_NAMESPACE", "default"),
                task_queue: env_or("WORKER_TASK_QUEUE", DEFAULT_TASK_QUEUE),
            },
            llm: LlmConfig {
                default_model: env::var(&model_var).unwrap_or_else(|_| env_or("LLM_MODEL", "llama3.2")),
                base_url: env_or("LLM_BASE_URL", "http://localhost:11434"),
                temperature: env_parse("LLM_TEMPERATURE", 0.2),
                max_tokens: env_parse("LLM_MAX_TOKENS", 1024),
                provider_type,
                api_key: env::var(&api_key_var).ok(),
            },
            mcp: McpConfig {
                url: env::var("MCP_URL").ok(),
                use_proxy: env_parse("MCP_USE_PROXY", false),
            },
            tools: ToolConfig {
                mock: env_parse("TOOLS_MOCK", false),
                tool_set: env_or("TOOL_SET", "default"),
            },
        }
    }
}
