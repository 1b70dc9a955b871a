// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Tool contract & registry (C1): uniform description, argument schema, and
//! invocation of tools. Local tools run a synchronous function in-process;
//! MCP tools are dispatched to the MCP client (C2) and must not be invoked
//! locally outside mock mode.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use crate::domain::tool::{ToolDefinition, ToolError, ToolSet};

/// A synchronous local tool implementation. `execute` takes the already
/// JSON-decoded arguments and returns the observation text.
#[async_trait]
pub trait LocalTool: Send + Sync {
    async fn execute(&self, args: &HashMap<String, JsonValue>) -> Result<String, ToolError>;
}

/// Either a real local implementation, or (in mock mode) a stub that always
/// succeeds with canned data — used so `ToolSet` construction can preload
/// registries for tests without a live MCP server.
pub struct MockLocalTool {
    pub stub_response: String,
}

#[async_trait]
impl LocalTool for MockLocalTool {
    async fn execute(&self, _args: &HashMap<String, JsonValue>) -> Result<String, ToolError> {
        Ok(self.stub_response.clone())
    }
}

enum ToolBackend {
    Local(Arc<dyn LocalTool>),
    Mcp,
}

struct RegisteredTool {
    definition: ToolDefinition,
    backend: ToolBackend,
}

/// Uniform tool description plus timing/error-classification around
/// invocation. `mock` propagates to MCP tools so local execution of an MCP
/// tool returns stub data instead of failing with `InvariantViolation`.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    mock: bool,
}

#[derive(Debug)]
pub struct ToolInvocationOutcome {
    pub observation: String,
    pub execution_time: std::time::Duration,
}

impl ToolRegistry {
    pub fn new(mock: bool) -> Self {
        Self { tools: HashMap::new(), mock }
    }

    pub fn register_local(&mut self, definition: ToolDefinition, tool: Arc<dyn LocalTool>) -> Result<(), ToolError> {
        self.insert(definition, ToolBackend::Local(tool))
    }

    pub fn register_mcp(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        self.insert(definition, ToolBackend::Mcp)
    }

    fn insert(&mut self, definition: ToolDefinition, backend: ToolBackend) -> Result<(), ToolError> {
        if self.tools.contains_key(&definition.name) {
            return Err(ToolError::DuplicateName(definition.name));
        }
        self.tools.insert(definition.name.clone(), RegisteredTool { definition, backend });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|t| &t.definition)
    }

    pub fn get_all(&self) -> Vec<&ToolDefinition> {
        self.tools.values().map(|t| &t.definition).collect()
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    /// Executes a *local* tool only — MCP dispatch happens one layer up in
    /// the `ToolExecute` activity, which has access to the MCP client.
    /// Invoking an MCP tool here fails with `InvariantViolation` unless mock
    /// mode is active, in which case it returns stub data.
    #[instrument(skip(self, args))]
    pub async fn execute_local(
        &self,
        name: &str,
        args: &HashMap<String, JsonValue>,
    ) -> Result<ToolInvocationOutcome, ToolError> {
        let started = Instant::now();
        let entry = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let observation = match &entry.backend {
            ToolBackend::Local(tool) => tool.execute(args).await?,
            ToolBackend::Mcp => {
                if self.mock {
                    format!("[mock] {name} called with {args:?}")
                } else {
                    return Err(ToolError::InvariantViolation(format!(
                        "'{name}' is an MCP tool and cannot be executed locally outside mock mode"
                    )));
                }
            }
        };

        Ok(ToolInvocationOutcome { observation, execution_time: started.elapsed() })
    }
}

/// Preloads a registry with every tool in a `ToolSet`. Concrete tool
/// implementations (weather/events/commerce) are external collaborators per
/// spec scope, so local entries are registered against a stub that reports
/// itself unimplemented — real deployments wire an actual `LocalTool` in
/// their place before the registry is handed to the engine; MCP entries are
/// wired for real remote dispatch immediately. `mock` propagates so MCP
/// tools can also be exercised locally in tests.
pub fn create_tool_set_registry(tool_set: &ToolSet, mock: bool) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new(mock);
    for tool in &tool_set.tools {
        if tool.is_mcp {
            registry.register_mcp(tool.clone())?;
        } else {
            let stub: Arc<dyn LocalTool> = Arc::new(MockLocalTool { stub_response: format!("[unimplemented local tool '{}']", tool.name) });
            registry.register_local(tool.clone(), stub)?;
        }
    }
    Ok(registry)
}
