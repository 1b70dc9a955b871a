// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
    #[error("invalid tool name '{0}': must be a valid identifier")]
    InvalidName(String),
    #[error("duplicate tool registration: {0}")]
    DuplicateName(String),
}

/// One argument accepted by a tool, as derived from its typed input model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub type_name: String,
    pub description: String,
    pub required: bool,
    pub default: Option<JsonValue>,
}

/// MCP binding details carried by a remote tool. `server_url` is populated
/// when the connection type is `http`; `command`/`args`/`env` back a `stdio`
/// connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpBinding {
    pub server_name: String,
    pub connection_type: ConnectionType,
    pub server_url: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Stdio,
    Http,
}

/// Uniform tool description. `Tool = Local{fn} | Mcp{server, name}` from the
/// design notes is expressed here as a metadata record (`ToolDefinition`)
/// plus a separate `is_mcp` flag rather than a closure-carrying enum, so that
/// tool definitions stay `Send + Sync + Serialize` on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub module: String,
    pub description: String,
    pub args_schema: Vec<ArgSpec>,
    pub is_mcp: bool,
    pub mcp: Option<McpBinding>,
}

impl ToolDefinition {
    pub fn validate_name(name: &str) -> Result<(), ToolError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .next()
                .map(|c| c.is_alphabetic() || c == '_')
                .unwrap_or(false)
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ToolError::InvalidName(name.to_string()))
        }
    }

    pub fn local(name: impl Into<String>, module: impl Into<String>, description: impl Into<String>, args_schema: Vec<ArgSpec>) -> Result<Self, ToolError> {
        let name = name.into();
        Self::validate_name(&name)?;
        Ok(Self {
            name,
            module: module.into(),
            description: description.into(),
            args_schema,
            is_mcp: false,
            mcp: None,
        })
    }

    pub fn mcp(
        name: impl Into<String>,
        module: impl Into<String>,
        description: impl Into<String>,
        args_schema: Vec<ArgSpec>,
        binding: McpBinding,
    ) -> Result<Self, ToolError> {
        let name = name.into();
        Self::validate_name(&name)?;
        Ok(Self {
            name,
            module: module.into(),
            description: description.into(),
            args_schema,
            is_mcp: true,
            mcp: Some(binding),
        })
    }
}

/// The synthetic terminal action every ReAct loop is offered alongside the
/// registered tools.
pub fn finish_tool_description() -> &'static str {
    "finish: call this when you have enough information to answer the user's question. Takes no arguments."
}

/// A named bundle of tools plus domain-specific prompt fragments injected
/// into the reasoning and extraction prompts.
#[derive(Debug, Clone)]
pub struct ToolSet {
    pub name: String,
    pub tools: Vec<ToolDefinition>,
    pub reasoning_prompt_fragment: String,
    pub extraction_prompt_fragment: String,
}
