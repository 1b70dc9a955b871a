// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub const FINISH_TOOL: &str = "finish";
pub const FINISH_OBSERVATION: &str = "Completed.";

/// One iteration of an agent turn's reasoning: the thought that produced a
/// tool decision, the decision itself, and (once resolved) its outcome.
///
/// Reimplemented from the source's untyped `{"thought_0": ..., "tool_name_0":
/// ...}` dictionary as an ordered, typed record; a flat string-map view is
/// only reconstructed at the LLM prompt-formatting boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryStep {
    pub iteration: u32,
    pub thought: String,
    pub tool_name: String,
    pub tool_args: HashMap<String, JsonValue>,
    pub observation: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TrajectoryStep {
    pub fn new(
        iteration: u32,
        thought: impl Into<String>,
        tool_name: impl Into<String>,
        tool_args: HashMap<String, JsonValue>,
    ) -> Self {
        Self {
            iteration,
            thought: thought.into(),
            tool_name: tool_name.into(),
            tool_args,
            observation: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_finish(&self) -> bool {
        self.tool_name == FINISH_TOOL
    }

    pub fn is_complete(&self) -> bool {
        self.observation.is_some() || self.error.is_some()
    }

    /// If this step is a `finish` decision, ensures its observation is set
    /// to the canonical terminal string. Returns whether it was a finish step.
    pub fn check_is_finish(&mut self) -> bool {
        if self.is_finish() {
            if self.observation.is_none() {
                self.observation = Some(FINISH_OBSERVATION.to_string());
            }
            true
        } else {
            false
        }
    }
}

/// Ordered reasoning record for one agent turn. Owned exclusively by the
/// agentic sub-workflow that produced it; handed up by value to the parent
/// conversation workflow's history, then discarded.
pub type Trajectory = Vec<TrajectoryStep>;

/// Index-continuity invariant check: steps are `0..N-1` in insertion order
/// and, if present, a `finish` step is the last one.
pub fn validate_trajectory(trajectory: &Trajectory) -> Result<(), String> {
    for (idx, step) in trajectory.iter().enumerate() {
        if step.iteration as usize != idx {
            return Err(format!(
                "trajectory step at position {idx} has non-contiguous iteration {}",
                step.iteration
            ));
        }
    }
    if let Some(finish_pos) = trajectory.iter().position(|s| s.is_finish()) {
        if finish_pos != trajectory.len() - 1 {
            return Err("finish step is not the last trajectory step".to_string());
        }
    }
    Ok(())
}

/// Human-readable summary: counts plus the distinct tools invoked, excluding
/// the synthetic `error`/`finish` pseudo-tools.
pub fn summarize_trajectory(trajectory: &Trajectory) -> String {
    if trajectory.is_empty() {
        return "No trajectories to summarize".to_string();
    }

    let thought_count = trajectory.len();
    let observation_count = trajectory.iter().filter(|s| s.observation.is_some()).count();
    let error_count = trajectory.iter().filter(|s| s.error.is_some()).count();

    let mut tools_used = Vec::new();
    for step in trajectory {
        if step.tool_name != "error" && step.tool_name != FINISH_TOOL && !tools_used.contains(&step.tool_name)
        {
            tools_used.push(step.tool_name.clone());
        }
    }

    format!(
        "Trajectories: {} | Thoughts: {} | Observations: {} | Errors: {} | Tools used: {}",
        trajectory.len(),
        thought_count,
        observation_count,
        error_count,
        if tools_used.is_empty() {
            "None".to_string()
        } else {
            tools_used.join(", ")
        }
    )
}
