// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Agentic sub-workflow (C4): runs one ReAct loop to produce one agent turn.
//! Modeled as a plain async function standing in for a child workflow (see
//! the durable-workflow engine design note) with an explicit `TurnState` for
//! observability even though control flow is a straight loop.

use std::collections::HashMap;
use tracing::{instrument, warn};

use crate::domain::activity::{ExtractStatus, ReactStatus, ToolExecutionRequest};
use crate::domain::llm::LlmProvider;
use crate::domain::mcp::{McpServerDescriptor, ToolNameResolution};
use crate::domain::trajectory::{Trajectory, FINISH_OBSERVATION, FINISH_TOOL};

use crate::application::activities::{extract_final, react_step, tool_execute};
use crate::application::mcp_client::McpClient;
use crate::application::tool_registry::ToolRegistry;

pub const MAX_ITERATIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Reasoning,
    Acting,
    Observing,
    Extracting,
    Done,
}

pub struct AgentTurnResult {
    pub message: String,
    pub tool_use_count: usize,
    pub trajectory: Trajectory,
}

/// Runs steps 1-5 of the agentic sub-workflow algorithm.
#[instrument(skip(llm, tools, mcp_client, mcp_servers))]
pub async fn run_agent_turn(
    llm: &dyn LlmProvider,
    tools: &ToolRegistry,
    mcp_client: &McpClient,
    mcp_servers: &HashMap<String, McpServerDescriptor>,
    tool_name_resolution: ToolNameResolution,
    user_message: &str,
    user_name: &str,
    domain_fragment: &str,
) -> AgentTurnResult {
    let mut trajectory: Trajectory = Vec::new();
    let mut tools_used: Vec<String> = Vec::new();
    let mut iteration: u32 = 1;
    let mut state = TurnState::Reasoning;

    loop {
        match state {
            TurnState::Reasoning => {
                let step = react_step(llm, tools, user_message, user_name, iteration, &trajectory, domain_fragment).await;
                if step.status == ReactStatus::Failed {
                    state = TurnState::Extracting;
                    continue;
                }
                trajectory = step.trajectory;

                if step.tool_name == FINISH_TOOL {
                    state = TurnState::Extracting;
                } else {
                    state = TurnState::Acting;
                }

                // Stash the decision for the Acting arm via a local, since
                // loop iterations share no mutable workflow-level state here.
                if state == TurnState::Acting {
                    let request = ToolExecutionRequest {
                        tool_name: step.tool_name.clone(),
                        tool_args: step.tool_args.clone(),
                        trajectory: trajectory.clone(),
                        current_iteration: iteration,
                    };
                    let result = tool_execute(tools, mcp_client, mcp_servers, tool_name_resolution, request).await;
                    trajectory = result.trajectory;
                    tools_used.push(step.tool_name.clone());
                    state = TurnState::Observing;
                }
            }
            TurnState::Acting => unreachable!("Acting is always immediately resolved from Reasoning"),
            TurnState::Observing => {
                iteration += 1;
                if iteration > MAX_ITERATIONS {
                    warn!(iteration, "agent turn hit the iteration cap without a finish decision");
                    state = TurnState::Extracting;
                } else {
                    state = TurnState::Reasoning;
                }
            }
            TurnState::Extracting => {
                let final_result = extract_final(llm, &trajectory, user_message, user_name, domain_fragment).await;
                let message = compose_final_message(&final_result, &trajectory);
                return AgentTurnResult { message, tool_use_count: tools_used.len(), trajectory };
            }
            TurnState::Done => unreachable!("Extracting always returns before Done is reached"),
        }
    }
}

/// Mirrors `AgenticAIWorkflow.run()`'s response derivation: prefer a
/// non-empty extracted answer; otherwise scan the trajectory backwards for
/// the most recent observation that is neither an error nor the synthetic
/// `"Completed."` finish marker; otherwise `"No result found"`. An
/// extraction failure overrides all of the above with `"Error: {detail}"`.
fn compose_final_message(final_result: &crate::domain::activity::ExtractAgentResult, trajectory: &Trajectory) -> String {
    if final_result.status == ExtractStatus::Success && !final_result.answer.trim().is_empty() {
        return final_result.answer.clone();
    }

    if final_result.status == ExtractStatus::Failed {
        return format!("Error: {}", final_result.error.clone().unwrap_or_else(|| "Unknown error".to_string()));
    }

    let fallback = trajectory.iter().rev().find_map(|step| {
        step.observation.as_ref().filter(|obs| !obs.starts_with("Error:") && obs.as_str() != FINISH_OBSERVATION)
    });

    match fallback {
        Some(obs) => obs.clone(),
        None => "No result found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{FinishReason, GenerationOptions, GenerationResponse, LlmError, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
            let mut responses = self.responses.lock().unwrap();
            let text = if responses.is_empty() { "{}".to_string() } else { responses.remove(0) };
            Ok(GenerationResponse { text, usage: TokenUsage::default(), provider: "scripted".to_string(), model: "test".to_string(), finish_reason: FinishReason::Stop })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn mcp_client() -> McpClient {
        McpClient::new(std::sync::Arc::new(crate::infrastructure::mcp_transport::DefaultMcpTransport::new()))
    }

    #[tokio::test]
    async fn single_turn_finish_on_first_step() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                r#"{"thought": "done", "tool_name": "finish", "tool_args": {}}"#.to_string(),
                r#"{"answer": "Hello."}"#.to_string(),
            ]),
        };
        let registry = ToolRegistry::new(false);
        let client = mcp_client();
        let result = run_agent_turn(&llm, &registry, &client, &HashMap::new(), ToolNameResolution::Direct, "hi", "ada", "").await;
        assert_eq!(result.message, "Hello.");
        assert_eq!(result.tool_use_count, 0);
        assert_eq!(result.trajectory.len(), 1);
        assert_eq!(result.trajectory[0].observation.as_deref(), Some(FINISH_OBSERVATION));
    }

    #[tokio::test]
    async fn unknown_tool_recovers_then_finishes() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                r#"{"thought": "try", "tool_name": "frobnicate", "tool_args": {}}"#.to_string(),
                r#"{"thought": "done", "tool_name": "finish", "tool_args": {}}"#.to_string(),
                r#"{"answer": "Recovered."}"#.to_string(),
            ]),
        };
        let registry = ToolRegistry::new(false);
        let client = mcp_client();
        let result = run_agent_turn(&llm, &registry, &client, &HashMap::new(), ToolNameResolution::Direct, "hi", "ada", "").await;
        assert_eq!(result.message, "Recovered.");
        assert_eq!(result.trajectory[0].error.as_deref(), Some("Error: Unknown tool frobnicate"));
    }

    #[tokio::test]
    async fn iteration_overflow_still_extracts() {
        let mut scripted = Vec::new();
        for _ in 0..MAX_ITERATIONS {
            scripted.push(r#"{"thought": "again", "tool_name": "frobnicate", "tool_args": {}}"#.to_string());
        }
        scripted.push(r#"{"answer": "Gave up gracefully."}"#.to_string());
        let llm = ScriptedLlm { responses: Mutex::new(scripted) };
        let registry = ToolRegistry::new(false);
        let client = mcp_client();
        let result = run_agent_turn(&llm, &registry, &client, &HashMap::new(), ToolNameResolution::Direct, "hi", "ada", "").await;
        assert_eq!(result.tool_use_count, MAX_ITERATIONS as usize);
        assert_eq!(result.message, "Gave up gracefully.");
    }

    #[tokio::test]
    async fn falls_back_to_most_recent_non_error_observation_when_extraction_is_empty() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                r#"{"thought": "try", "tool_name": "echo", "tool_args": {}}"#.to_string(),
                r#"{"thought": "done", "tool_name": "finish", "tool_args": {}}"#.to_string(),
                r#"{"answer": ""}"#.to_string(),
            ]),
        };
        let mut registry = ToolRegistry::new(false);
        let def = crate::domain::tool::ToolDefinition::local("echo", "core", "echoes", vec![]).unwrap();
        registry
            .register_local(def, std::sync::Arc::new(crate::application::tool_registry::MockLocalTool { stub_response: "Forecast: sunny".to_string() }))
            .unwrap();
        let client = mcp_client();
        let result = run_agent_turn(&llm, &registry, &client, &HashMap::new(), ToolNameResolution::Direct, "hi", "ada", "").await;
        assert_eq!(result.message, "Forecast: sunny");
    }
}
