// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow id '{0}' must be non-empty")]
    EmptyId(String),
    #[error("workflow '{0}' not found")]
    NotFound(String),
    #[error("workflow '{0}' already ended")]
    AlreadyEnded(String),
    #[error("durable-workflow engine unreachable at startup")]
    EngineUnreachable,
}

/// Opaque, validated workflow identifier. Construction is the only way to
/// obtain one, so every `WorkflowId` in the system is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new(raw: impl Into<String>) -> Result<Self, WorkflowError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(WorkflowError::EmptyId(raw));
        }
        Ok(Self(raw))
    }

    /// Generates a fresh id following the external contract's
    /// `"durable-agent-{uuid}"` naming.
    pub fn generate() -> Self {
        Self(format!("durable-agent-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Ended,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Running => "running",
            WorkflowStatus::Ended => "ended",
        }
    }
}

/// External projection returned by queries: `{workflow_id, status,
/// query_count, last_response}` from the data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    pub query_count: u64,
    pub last_response: Option<String>,
}

/// Response shape for the `state` query: `{status, last_response,
/// conversation_history?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStateView {
    pub status: WorkflowStatus,
    pub last_response: Option<String>,
    pub conversation_history: Option<Vec<super::message::Message>>,
}

/// Response shape for the `workflow_details` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDetails {
    pub status: WorkflowStatus,
    pub message_count: usize,
    pub interaction_count: u64,
    pub tools_used: Vec<String>,
    pub execution_time_ms: u128,
    pub trajectory_keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_id() {
        assert!(WorkflowId::new("").is_err());
        assert!(WorkflowId::new("   ").is_err());
    }

    #[test]
    fn generated_ids_follow_external_naming_contract() {
        let id = WorkflowId::generate();
        assert!(id.as_str().starts_with("durable-agent-"));
    }
}
