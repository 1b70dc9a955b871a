// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Request/result records passed between the three activities (C3) and the
//! agentic sub-workflow that drives them.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use super::trajectory::Trajectory;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("failed to parse reasoning output into a tool decision: {0}")]
    ParseFailure(String),
    #[error("llm call failed: {0}")]
    Llm(#[from] super::llm::LlmError),
    #[error("mcp call failed: {0}")]
    Mcp(#[from] super::mcp::McpClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactStatus {
    Success,
    Failed,
}

/// Outcome of one `ReactStep` call: the updated trajectory plus the decided
/// next action, or a failure that should break the enclosing loop.
#[derive(Debug, Clone)]
pub struct ReactAgentResult {
    pub status: ReactStatus,
    pub trajectory: Trajectory,
    pub tool_name: String,
    pub tool_args: HashMap<String, JsonValue>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ToolExecutionRequest {
    pub tool_name: String,
    pub tool_args: HashMap<String, JsonValue>,
    pub trajectory: Trajectory,
    pub current_iteration: u32,
}

#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub success: bool,
    pub trajectory: Trajectory,
    pub observation_or_error: String,
    pub execution_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ExtractAgentResult {
    pub status: ExtractStatus,
    pub answer: String,
    pub reasoning: Option<String>,
    pub error: Option<String>,
}
