// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Process bootstrap (C7): config -> tracing -> LLM provider registry -> tool
//! registry -> durable-workflow engine, in the order the worker startup
//! section specifies.

use std::collections::HashMap;
use std::sync::Arc;

use durable_agent_core::application::mcp_client::McpClient;
use durable_agent_core::application::tool_registry::ToolRegistry;
use durable_agent_core::application::workflow_engine::WorkflowEngine;
use durable_agent_core::domain::llm::LlmProvider;
use durable_agent_core::infrastructure::config::AppConfig;
use durable_agent_core::infrastructure::llm::mock_provider::MockLlmProvider;
use durable_agent_core::infrastructure::llm::registry::ProviderRegistry;
use durable_agent_core::infrastructure::mcp_transport::DefaultMcpTransport;
use durable_agent_core::infrastructure::repositories::InMemoryConversationRepository;
use durable_agent_core::infrastructure::telemetry;

/// Default domain fragment injected into reasoning/extraction prompts when no
/// tool set is loaded. Concrete tool sets (weather/events/commerce) are wired
/// by an external integration point, not this binary.
const DEFAULT_DOMAIN_FRAGMENT: &str = "You are a helpful assistant. Use tools only when the user's question requires information you don't already have.";

/// Builds the durable-workflow engine from environment configuration. Mirrors
/// the worker startup order: config, then tracing, then the LLM provider
/// registry, then the tool registry, then the engine itself.
pub fn bootstrap() -> anyhow::Result<WorkflowEngine> {
    let config = AppConfig::from_env();
    telemetry::init_tracing();

    // LLM provider bindings are an external collaborator (spec §1); the core
    // only carries the `LlmProvider` seam, so the registry is seeded with a
    // canned stand-in here rather than a concrete Ollama/OpenAI/Anthropic
    // adapter. A real deployment wires its own binding in under "default"
    // before handing the engine to long-lived workflows.
    let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
    providers.insert(
        "default".to_string(),
        Arc::new(MockLlmProvider { canned_response: r#"{"answer": "No LLM binding is configured."}"#.to_string() }),
    );
    let llm: Arc<dyn LlmProvider> = Arc::new(ProviderRegistry::new(providers, "default"));

    // No concrete tool set is wired in by default (weather/events/commerce
    // implementations are an external integration point); callers that need
    // one construct it via `create_tool_set_registry` and swap it in before
    // the engine is handed to long-lived workflows.
    let tools = Arc::new(ToolRegistry::new(config.tools.mock));

    let mcp_client = Arc::new(McpClient::new(Arc::new(DefaultMcpTransport::new())));
    let mcp_servers = Arc::new(HashMap::new());
    let repository = Arc::new(InMemoryConversationRepository::new());

    Ok(WorkflowEngine::new(
        llm,
        tools,
        mcp_client,
        mcp_servers,
        repository,
        DEFAULT_DOMAIN_FRAGMENT.to_string(),
        config.mcp.tool_name_resolution(),
    ))
}
