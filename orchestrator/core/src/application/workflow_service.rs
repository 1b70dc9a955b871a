// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Workflow service (C6): a thin, stateless client of the durable-workflow
//! engine, matching the HTTP façade's operations one-to-one without itself
//! depending on any transport.

use tracing::instrument;
use uuid::Uuid;

use crate::domain::tool::ToolDefinition;
use crate::domain::trajectory::Trajectory;
use crate::domain::workflow::{WorkflowError, WorkflowId, WorkflowState, WorkflowStatus};

use crate::application::workflow_engine::WorkflowEngine;

pub struct WorkflowService<'a> {
    engine: &'a WorkflowEngine,
}

impl<'a> WorkflowService<'a> {
    pub fn new(engine: &'a WorkflowEngine) -> Self {
        Self { engine }
    }

    pub fn new_workflow_id() -> WorkflowId {
        WorkflowId::generate()
    }

    /// If a workflow with the given id is running, signals it with the
    /// prompt; otherwise starts one on the fixed task queue and sends the
    /// initial prompt as its first message.
    #[instrument(skip(self))]
    pub async fn process_message(
        &self,
        text: String,
        workflow_id: Option<WorkflowId>,
        user_name: String,
    ) -> Result<WorkflowState, WorkflowError> {
        let workflow_id = workflow_id.unwrap_or_else(|| WorkflowId::new(format!("durable-agent-{}", Uuid::new_v4())).expect("generated id is non-empty"));

        if self.engine.is_running(&workflow_id).await {
            self.engine.signal_prompt(&workflow_id, text).await?;
        } else {
            self.engine.start_workflow(workflow_id.clone(), user_name, text).await;
        }

        self.get_state(&workflow_id).await
    }

    pub async fn get_state(&self, workflow_id: &WorkflowId) -> Result<WorkflowState, WorkflowError> {
        let handle = self.engine.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        let view = handle.query_state(false).await;
        Ok(WorkflowState {
            workflow_id: workflow_id.clone(),
            status: view.status,
            query_count: handle.query_count().await,
            last_response: view.last_response,
        })
    }

    pub async fn get_history(&self, workflow_id: &WorkflowId) -> Result<Vec<crate::domain::message::Message>, WorkflowError> {
        let handle = self.engine.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        Ok(handle.query_history().await)
    }

    pub async fn get_trajectories(&self, workflow_id: &WorkflowId) -> Result<Vec<Trajectory>, WorkflowError> {
        let handle = self.engine.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        Ok(handle.query_trajectories().await)
    }

    pub async fn get_tools(&self, workflow_id: &WorkflowId) -> Result<Vec<ToolDefinition>, WorkflowError> {
        let handle = self.engine.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        Ok(handle.query_tools())
    }

    pub async fn end(&self, workflow_id: &WorkflowId) -> Result<(), WorkflowError> {
        self.engine.signal_end(workflow_id).await
    }

    pub async fn request_summary(&self, workflow_id: &WorkflowId) -> Result<(), WorkflowError> {
        self.engine.signal_request_summary(workflow_id).await
    }

    pub async fn status_str(&self, workflow_id: &WorkflowId) -> Result<WorkflowStatus, WorkflowError> {
        let handle = self.engine.get(workflow_id).await.ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        Ok(handle.query_status().await)
    }
}
