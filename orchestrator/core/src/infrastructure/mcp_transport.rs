// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Wire-level MCP transports. Each call here opens a fresh connection (HTTP
//! request, or spawned stdio process), performs exactly one JSON-RPC
//! exchange, and tears the connection down — no client is ever stored across
//! calls, following the protocol's per-call context-manager discipline.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::domain::mcp::{McpClientError, McpServerDescriptor, ToolDescriptor};
use crate::domain::tool::ConnectionType;

#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn list_tools(&self, server: &McpServerDescriptor) -> Result<Vec<ToolDescriptor>, McpClientError>;
    async fn get_resource(&self, server: &McpServerDescriptor, uri: &str) -> Result<JsonValue, McpClientError>;
    async fn call_tool(
        &self,
        server: &McpServerDescriptor,
        tool_name: &str,
        arguments: JsonValue,
    ) -> Result<JsonValue, McpClientError>;
}

fn jsonrpc_request(method: &str, params: JsonValue) -> JsonValue {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    })
}

fn extract_result(envelope: &JsonValue) -> Option<&JsonValue> {
    envelope.get("result")
}

/// Default transport: dispatches per call to an HTTP POST or a spawned
/// stdio subprocess depending on `server.connection_type`.
#[derive(Default)]
pub struct DefaultMcpTransport {
    http: reqwest::Client,
}

impl DefaultMcpTransport {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    async fn send_http(&self, server: &McpServerDescriptor, method: &str, params: JsonValue) -> Result<JsonValue, McpClientError> {
        let url = server.url.clone().ok_or_else(|| McpClientError::Transport {
            server: server.name.clone(),
            detail: "http connection requires a url".to_string(),
        })?;

        let body = jsonrpc_request(method, params);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;

        let envelope: JsonValue = response
            .json()
            .await
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;

        extract_result(&envelope)
            .cloned()
            .ok_or_else(|| McpClientError::Transport { server: server.name.clone(), detail: "no result in response".to_string() })
    }

    async fn send_stdio(&self, server: &McpServerDescriptor, method: &str, params: JsonValue) -> Result<JsonValue, McpClientError> {
        let mut child = Command::new(&server.command)
            .args(&server.args)
            .envs(&server.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;

        let mut stdin = child.stdin.take().ok_or_else(|| McpClientError::Transport {
            server: server.name.clone(),
            detail: "failed to open child stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| McpClientError::Transport {
            server: server.name.clone(),
            detail: "failed to open child stdout".to_string(),
        })?;

        let request = jsonrpc_request(method, params);
        let mut line = serde_json::to_vec(&request)
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;
        line.push(b'\n');
        stdin
            .write_all(&line)
            .await
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;
        stdin
            .shutdown()
            .await
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;

        let mut reader = BufReader::new(stdout);
        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .await
            .map_err(|e| McpClientError::Transport { server: server.name.clone(), detail: e.to_string() })?;

        let _ = child.kill().await;

        let envelope: JsonValue = serde_json::from_str(response_line.trim()).map_err(|e| McpClientError::Transport {
            server: server.name.clone(),
            detail: format!("malformed response: {e}"),
        })?;

        extract_result(&envelope)
            .cloned()
            .ok_or_else(|| McpClientError::Transport { server: server.name.clone(), detail: "no result in response".to_string() })
    }

    async fn send(&self, server: &McpServerDescriptor, method: &str, params: JsonValue) -> Result<JsonValue, McpClientError> {
        match server.connection_type {
            ConnectionType::Http => self.send_http(server, method, params).await,
            ConnectionType::Stdio => self.send_stdio(server, method, params).await,
        }
    }
}

#[async_trait]
impl McpTransport for DefaultMcpTransport {
    async fn list_tools(&self, server: &McpServerDescriptor) -> Result<Vec<ToolDescriptor>, McpClientError> {
        let result = self.send(server, "tools/list", serde_json::json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(tools
            .into_iter()
            .filter_map(|t| {
                Some(ToolDescriptor {
                    name: t.get("name")?.as_str()?.to_string(),
                    description: t.get("description").and_then(|d| d.as_str()).unwrap_or("").to_string(),
                    input_schema: t.get("inputSchema").cloned().unwrap_or(JsonValue::Null),
                })
            })
            .collect())
    }

    async fn get_resource(&self, server: &McpServerDescriptor, uri: &str) -> Result<JsonValue, McpClientError> {
        self.send(server, "resources/read", serde_json::json!({ "uri": uri })).await
    }

    async fn call_tool(
        &self,
        server: &McpServerDescriptor,
        tool_name: &str,
        arguments: JsonValue,
    ) -> Result<JsonValue, McpClientError> {
        self.send(
            server,
            "tools/call",
            serde_json::json!({ "name": tool_name, "arguments": arguments }),
        )
        .await
    }
}

/// Extracts the first text content block from a `tools/call` result, falling
/// back to the string representation of the whole result when no content
/// block is present.
pub fn extract_text_result(result: &JsonValue) -> String {
    if let Some(blocks) = result.get("content").and_then(|c| c.as_array()) {
        for block in blocks {
            if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    return text.to_string();
                }
            }
        }
    }
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_text_block() {
        let result = serde_json::json!({
            "content": [
                {"type": "text", "text": "Forecast: sunny"},
                {"type": "image", "data": "..."}
            ]
        });
        assert_eq!(extract_text_result(&result), "Forecast: sunny");
    }

    #[test]
    fn falls_back_to_string_representation_without_content() {
        let result = serde_json::json!({"status": "ok"});
        assert_eq!(extract_text_result(&result), result.to_string());
    }
}
