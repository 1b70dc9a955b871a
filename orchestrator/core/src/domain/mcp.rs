// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::tool::{ConnectionType, McpBinding};

#[derive(Debug, Error)]
pub enum McpClientError {
    #[error("transport error talking to MCP server '{server}': {detail}")]
    Transport { server: String, detail: String },
    #[error("MCP server '{server}' returned no content for tool '{tool}'")]
    EmptyResult { server: String, tool: String },
    #[error("exhausted {attempts} retries calling '{tool}' on '{server}': {last_error}")]
    RetriesExhausted {
        server: String,
        tool: String,
        attempts: u32,
        last_error: String,
    },
}

/// A server the MCP client can talk to. Mirrors `MCPServerDefinition` from
/// the original tool-definitions model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerDescriptor {
    pub name: String,
    pub connection_type: ConnectionType,
    pub command: String,
    pub args: Vec<String>,
    pub env: std::collections::HashMap<String, String>,
    pub url: Option<String>,
}

impl From<&McpBinding> for McpServerDescriptor {
    fn from(binding: &McpBinding) -> Self {
        Self {
            name: binding.server_name.clone(),
            connection_type: binding.connection_type,
            command: binding.command.clone().unwrap_or_else(|| "python".to_string()),
            args: binding.args.clone(),
            env: binding.env.clone(),
            url: binding.server_url.clone(),
        }
    }
}

/// A tool as advertised by `tools/list` on a remote server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

/// Whether a proxy is mounting multiple servers under prefixed names, or the
/// client talks to each server directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolNameResolution {
    Direct,
    ProxyMounted,
}

/// Computes the effective tool name under the active resolution mode. Under
/// a mounting proxy the name is `"{server_name}_{tool_name}"`; connecting
/// directly it is the bare tool name. Computed at call time so tools never
/// need duplicate registration per mode.
pub fn resolve_tool_name(mode: ToolNameResolution, server_name: &str, tool_name: &str) -> String {
    match mode {
        ToolNameResolution::Direct => tool_name.to_string(),
        ToolNameResolution::ProxyMounted => format!("{server_name}_{tool_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_mode_uses_bare_name() {
        assert_eq!(
            resolve_tool_name(ToolNameResolution::Direct, "weather", "forecast"),
            "forecast"
        );
    }

    #[test]
    fn proxy_mode_prefixes_with_server_name() {
        assert_eq!(
            resolve_tool_name(ToolNameResolution::ProxyMounted, "weather", "forecast"),
            "weather_forecast"
        );
    }
}
