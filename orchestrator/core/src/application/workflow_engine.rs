// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Self-contained in-process durable-workflow engine standing in for the
//! Temporal worker/engine pairing (design note OQ-1: the teacher's gRPC
//! `TemporalClient` depends on vendored `.proto` files absent from this
//! codebase). Grounded on the teacher's `application/workflow_engine.rs`
//! `active_instances: Arc<RwLock<HashMap<...>>>` registry pattern, generalized
//! here to register live conversation workflows rather than agent instances.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::domain::mcp::{McpServerDescriptor, ToolNameResolution};
use crate::domain::repository::ConversationRepository;
use crate::domain::workflow::{WorkflowError, WorkflowId, WorkflowStatus};

use crate::application::conversation_workflow::{spawn, ConversationDeps, ConversationHandle, ConversationSignal};
use crate::application::mcp_client::McpClient;
use crate::application::tool_registry::ToolRegistry;
use crate::domain::llm::LlmProvider;

/// Logical task queue name retained from the external contract even though
/// no real Temporal server is registered against it (spec §6).
pub const TASK_QUEUE: &str = "durable-ai-agent-tasks";

/// The registry of live conversation workflows, plus the shared dependencies
/// every new instance is spawned with. One per worker process.
pub struct WorkflowEngine {
    active: Arc<RwLock<HashMap<WorkflowId, ConversationHandle>>>,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    mcp_client: Arc<McpClient>,
    mcp_servers: Arc<HashMap<String, McpServerDescriptor>>,
    repository: Arc<dyn ConversationRepository>,
    domain_fragment: String,
    tool_name_resolution: ToolNameResolution,
}

impl WorkflowEngine {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        mcp_client: Arc<McpClient>,
        mcp_servers: Arc<HashMap<String, McpServerDescriptor>>,
        repository: Arc<dyn ConversationRepository>,
        domain_fragment: String,
        tool_name_resolution: ToolNameResolution,
    ) -> Self {
        Self { active: Arc::new(RwLock::new(HashMap::new())), llm, tools, mcp_client, mcp_servers, repository, domain_fragment, tool_name_resolution }
    }

    /// Starts a new conversation workflow registered under `workflow_id` and
    /// feeds it the given prompt as its first message.
    #[instrument(skip(self))]
    pub async fn start_workflow(&self, workflow_id: WorkflowId, user_name: String, initial_prompt: String) -> ConversationHandle {
        let deps = ConversationDeps {
            llm: self.llm.clone(),
            tools: self.tools.clone(),
            mcp_client: self.mcp_client.clone(),
            mcp_servers: self.mcp_servers.clone(),
            repository: self.repository.clone(),
            domain_fragment: self.domain_fragment.clone(),
            tool_name_resolution: self.tool_name_resolution,
        };
        let handle = spawn(workflow_id.clone(), user_name, initial_prompt, deps);
        self.active.write().await.insert(workflow_id, handle.clone());
        handle
    }

    pub async fn get(&self, workflow_id: &WorkflowId) -> Option<ConversationHandle> {
        self.active.read().await.get(workflow_id).cloned()
    }

    pub async fn is_running(&self, workflow_id: &WorkflowId) -> bool {
        match self.get(workflow_id).await {
            Some(handle) => handle.query_status().await == WorkflowStatus::Running,
            None => false,
        }
    }

    /// Signals an already-registered workflow with a new prompt.
    pub async fn signal_prompt(&self, workflow_id: &WorkflowId, text: String) -> Result<(), WorkflowError> {
        let handle = self.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        if handle.query_status().await == WorkflowStatus::Ended {
            return Err(WorkflowError::AlreadyEnded(workflow_id.to_string()));
        }
        handle.signal(ConversationSignal::Prompt(text));
        Ok(())
    }

    pub async fn signal_end(&self, workflow_id: &WorkflowId) -> Result<(), WorkflowError> {
        let handle = self.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        handle.signal(ConversationSignal::EndChat);
        Ok(())
    }

    pub async fn signal_request_summary(&self, workflow_id: &WorkflowId) -> Result<(), WorkflowError> {
        let handle = self.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        handle.signal(ConversationSignal::RequestSummary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{FinishReason, GenerationOptions, GenerationResponse, LlmError};
    use crate::infrastructure::mcp_transport::DefaultMcpTransport;
    use crate::infrastructure::repositories::InMemoryConversationRepository;
    use async_trait::async_trait;

    struct AlwaysFinishLlm;

    #[async_trait]
    impl LlmProvider for AlwaysFinishLlm {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
            let text = if prompt.contains("tool_args") {
                r#"{"thought": "done", "tool_name": "finish", "tool_args": {}}"#.to_string()
            } else {
                r#"{"answer": "Hi there."}"#.to_string()
            };
            Ok(GenerationResponse { text, usage: Default::default(), provider: "test".to_string(), model: "test".to_string(), finish_reason: FinishReason::Stop })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(
            Arc::new(AlwaysFinishLlm),
            Arc::new(ToolRegistry::new(false)),
            Arc::new(McpClient::new(Arc::new(DefaultMcpTransport::new()))),
            Arc::new(HashMap::new()),
            Arc::new(InMemoryConversationRepository::new()),
            String::new(),
            ToolNameResolution::Direct,
        )
    }

    #[tokio::test]
    async fn starting_a_workflow_registers_it_as_running() {
        let engine = engine();
        let id = WorkflowId::new("durable-agent-engine-1").unwrap();
        engine.start_workflow(id.clone(), "ada".to_string(), "hi".to_string()).await;
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(engine.is_running(&id).await);
    }

    #[tokio::test]
    async fn signalling_an_unknown_workflow_fails_with_not_found() {
        let engine = engine();
        let id = WorkflowId::new("durable-agent-missing").unwrap();
        let err = engine.signal_prompt(&id, "hi".to_string()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }
}
