// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::conversation::ConversationState;
use crate::domain::repository::{ConversationRepository, RepositoryError};
use crate::domain::trajectory::Trajectory;
use crate::domain::workflow::WorkflowId;

/// Retained trajectories per conversation, bounded so a long-running
/// conversation's memory usage doesn't grow without limit.
const MAX_RETAINED_TRAJECTORIES: usize = 50;

#[derive(Clone, Default)]
pub struct InMemoryConversationRepository {
    states: Arc<Mutex<HashMap<WorkflowId, ConversationState>>>,
    trajectories: Arc<Mutex<HashMap<WorkflowId, Vec<Trajectory>>>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn save(&self, id: &WorkflowId, state: &ConversationState) -> Result<(), RepositoryError> {
        self.states.lock().insert(id.clone(), state.clone());
        Ok(())
    }

    async fn find(&self, id: &WorkflowId) -> Result<Option<ConversationState>, RepositoryError> {
        Ok(self.states.lock().get(id).cloned())
    }

    async fn delete(&self, id: &WorkflowId) -> Result<(), RepositoryError> {
        self.states.lock().remove(id);
        self.trajectories.lock().remove(id);
        Ok(())
    }

    async fn append_trajectory(
        &self,
        id: &WorkflowId,
        trajectory: Trajectory,
    ) -> Result<(), RepositoryError> {
        let mut trajectories = self.trajectories.lock();
        let entry = trajectories.entry(id.clone()).or_default();
        entry.push(trajectory);
        if entry.len() > MAX_RETAINED_TRAJECTORIES {
            let drop = entry.len() - MAX_RETAINED_TRAJECTORIES;
            entry.drain(0..drop);
        }
        Ok(())
    }

    async fn recent_trajectories(
        &self,
        id: &WorkflowId,
        limit: usize,
    ) -> Result<Vec<Trajectory>, RepositoryError> {
        let trajectories = self.trajectories.lock();
        let Some(entry) = trajectories.get(id) else {
            return Ok(Vec::new());
        };
        let start = entry.len().saturating_sub(limit);
        Ok(entry[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trajectory::TrajectoryStep;
    use std::collections::HashMap as Map;

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let repo = InMemoryConversationRepository::new();
        let id = WorkflowId::new("wf-1").unwrap();
        let mut state = ConversationState::new();
        state.add_message(crate::domain::message::Role::User, "hi").unwrap();
        repo.save(&id, &state).await.unwrap();

        let found = repo.find(&id).await.unwrap().unwrap();
        assert_eq!(found.messages.len(), 1);
    }

    #[tokio::test]
    async fn recent_trajectories_returns_empty_for_unknown_workflow() {
        let repo = InMemoryConversationRepository::new();
        let id = WorkflowId::new("wf-missing").unwrap();
        assert!(repo.recent_trajectories(&id, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trajectory_window_retains_only_most_recent_limit() {
        let repo = InMemoryConversationRepository::new();
        let id = WorkflowId::new("wf-2").unwrap();
        for i in 0..3 {
            let traj = vec![TrajectoryStep::new(0, "t", "finish", Map::new())];
            let _ = i;
            repo.append_trajectory(&id, traj).await.unwrap();
        }
        let recent = repo.recent_trajectories(&id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
