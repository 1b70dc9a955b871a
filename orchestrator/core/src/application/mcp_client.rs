// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! MCP client orchestration (C2): per-call connect/use/close discipline over
//! the wire transport, with exponential backoff retry. No client is ever
//! cached between calls — each invocation resolves its server descriptor,
//! dispatches through the transport, and discards it.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::domain::mcp::{McpClientError, McpServerDescriptor, ToolDescriptor};
use crate::infrastructure::mcp_transport::{extract_text_result, McpTransport};

/// Default retry ceiling: three attempts, backing off `2^attempt` seconds
/// (1s, 2s, 4s) between them, matching the manager this is grounded on.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub struct McpClient {
    transport: Arc<dyn McpTransport>,
    max_retries: u32,
}

impl McpClient {
    pub fn new(transport: Arc<dyn McpTransport>) -> Self {
        Self { transport, max_retries: DEFAULT_MAX_RETRIES }
    }

    pub fn with_max_retries(transport: Arc<dyn McpTransport>, max_retries: u32) -> Self {
        Self { transport, max_retries }
    }

    #[instrument(skip(self, server))]
    pub async fn list_tools(&self, server: &McpServerDescriptor) -> Result<Vec<ToolDescriptor>, McpClientError> {
        self.retrying(server, "tools/list", || self.transport.list_tools(server)).await
    }

    #[instrument(skip(self, server))]
    pub async fn get_resource(&self, server: &McpServerDescriptor, uri: &str) -> Result<JsonValue, McpClientError> {
        self.retrying(server, "resources/read", || self.transport.get_resource(server, uri)).await
    }

    /// Calls a tool and returns its extracted text observation. Retries the
    /// full per-call connect/use/close cycle up to `max_retries` times with
    /// `2^attempt` second backoff; the last error is surfaced verbatim as
    /// `RetriesExhausted` once attempts are exhausted.
    #[instrument(skip(self, server, arguments))]
    pub async fn call_tool(
        &self,
        server: &McpServerDescriptor,
        tool_name: &str,
        arguments: JsonValue,
    ) -> Result<String, McpClientError> {
        let mut last_error: Option<McpClientError> = None;

        for attempt in 0..self.max_retries {
            match self.transport.call_tool(server, tool_name, arguments.clone()).await {
                Ok(result) => return Ok(extract_text_result(&result)),
                Err(err) => {
                    warn!(attempt, tool = tool_name, server = %server.name, error = %err, "mcp call_tool attempt failed");
                    last_error = Some(err);
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    }
                }
            }
        }

        Err(McpClientError::RetriesExhausted {
            server: server.name.clone(),
            tool: tool_name.to_string(),
            attempts: self.max_retries,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn retrying<T, F, Fut>(&self, server: &McpServerDescriptor, op: &str, f: F) -> Result<T, McpClientError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, McpClientError>>,
    {
        let mut last_error: Option<McpClientError> = None;

        for attempt in 0..self.max_retries {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt, op, server = %server.name, error = %err, "mcp attempt failed");
                    last_error = Some(err);
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    }
                }
            }
        }

        Err(McpClientError::RetriesExhausted {
            server: server.name.clone(),
            tool: op.to_string(),
            attempts: self.max_retries,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::domain::tool::ConnectionType;

    struct FlakyTransport {
        calls: AtomicU32,
        fail_until: u32,
        observed_delays: Mutex<Vec<()>>,
    }

    #[async_trait]
    impl McpTransport for FlakyTransport {
        async fn list_tools(&self, _server: &McpServerDescriptor) -> Result<Vec<ToolDescriptor>, McpClientError> {
            unimplemented!()
        }

        async fn get_resource(&self, _server: &McpServerDescriptor, _uri: &str) -> Result<JsonValue, McpClientError> {
            unimplemented!()
        }

        async fn call_tool(
            &self,
            server: &McpServerDescriptor,
            tool_name: &str,
            _arguments: JsonValue,
        ) -> Result<JsonValue, McpClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_until {
                self.observed_delays.lock().unwrap().push(());
                Err(McpClientError::Transport { server: server.name.clone(), detail: "boom".to_string() })
            } else {
                Ok(serde_json::json!({"content": [{"type": "text", "text": format!("ok:{tool_name}")}]}))
            }
        }
    }

    fn descriptor() -> McpServerDescriptor {
        McpServerDescriptor {
            name: "weather".to_string(),
            connection_type: ConnectionType::Http,
            command: "noop".to_string(),
            args: vec![],
            env: Default::default(),
            url: Some("http://localhost:9000".to_string()),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_retry_budget() {
        let transport = Arc::new(FlakyTransport { calls: AtomicU32::new(0), fail_until: 2, observed_delays: Mutex::new(vec![]) });
        let client = McpClient::new(transport);
        let result = client.call_tool(&descriptor(), "forecast", serde_json::json!({})).await.unwrap();
        assert_eq!(result, "ok:forecast");
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_last_error() {
        let transport = Arc::new(FlakyTransport { calls: AtomicU32::new(0), fail_until: 99, observed_delays: Mutex::new(vec![]) });
        let client = McpClient::with_max_retries(transport.clone(), 3);
        let err = client.call_tool(&descriptor(), "forecast", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, McpClientError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }
}
