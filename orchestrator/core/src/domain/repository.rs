// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use thiserror::Error;

use super::conversation::ConversationState;
use super::trajectory::Trajectory;
use super::workflow::WorkflowId;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("conversation '{0}' not found")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable storage for conversation state, keyed by workflow id. The spec's
/// Non-goals exclude persistent storage beyond what the workflow engine
/// provides; the in-memory implementation in `infrastructure::repositories`
/// satisfies that by construction, while this trait is the seam a real
/// engine-backed store would implement against.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn save(&self, id: &WorkflowId, state: &ConversationState) -> Result<(), RepositoryError>;
    async fn find(&self, id: &WorkflowId) -> Result<Option<ConversationState>, RepositoryError>;
    async fn delete(&self, id: &WorkflowId) -> Result<(), RepositoryError>;

    /// Appends a turn's trajectory to the retained-trajectory window for a
    /// conversation (see `trajectories` query, spec §4.5).
    async fn append_trajectory(
        &self,
        id: &WorkflowId,
        trajectory: Trajectory,
    ) -> Result<(), RepositoryError>;
    async fn recent_trajectories(
        &self,
        id: &WorkflowId,
        limit: usize,
    ) -> Result<Vec<Trajectory>, RepositoryError>;
}
