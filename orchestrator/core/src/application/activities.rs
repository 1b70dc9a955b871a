// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! The three durable activities (C3): `react_step`, `tool_execute`, and
//! `extract_final`. Each takes its LLM/registry/MCP-client dependencies
//! explicitly rather than reading global state (spec §9 design note).

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{instrument, warn};

use crate::domain::activity::{
    ExtractAgentResult, ExtractStatus, ReactAgentResult, ReactStatus, ToolExecutionRequest, ToolExecutionResult,
};
use crate::domain::llm::{GenerationOptions, LlmError, LlmProvider};
use crate::domain::mcp::{resolve_tool_name, McpServerDescriptor, ToolNameResolution};
use crate::domain::trajectory::{Trajectory, TrajectoryStep};

use crate::application::mcp_client::McpClient;
use crate::application::tool_registry::ToolRegistry;
use crate::infrastructure::prompt_template::{
    format_tool_list, format_trajectory, ExtractionContext, PromptTemplateEngine, ReasoningContext,
    DEFAULT_EXTRACTION_TEMPLATE, DEFAULT_REASONING_TEMPLATE,
};

pub const ACTIVITY_MAX_RETRIES: u32 = 3;
pub const ACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);
const ACTIVITY_MIN_BACKOFF_SECS: u64 = 1;
const ACTIVITY_MAX_BACKOFF_SECS: u64 = 10;

/// Retries a fallible async LLM call up to `ACTIVITY_MAX_RETRIES` times with
/// a 1s-to-10s exponential backoff, wrapping each attempt in the activity
/// timeout. The last error is returned once attempts are exhausted.
async fn call_llm_with_retry(
    llm: &dyn LlmProvider,
    prompt: &str,
    options: &GenerationOptions,
) -> Result<String, LlmError> {
    let mut last_error = None;
    for attempt in 0..ACTIVITY_MAX_RETRIES {
        let call = tokio::time::timeout(ACTIVITY_TIMEOUT, llm.generate(prompt, options));
        match call.await {
            Ok(Ok(response)) => return Ok(response.text),
            Ok(Err(err)) => {
                warn!(attempt, error = %err, "llm generate attempt failed");
                last_error = Some(err);
            }
            Err(_) => {
                warn!(attempt, "llm generate attempt timed out");
                last_error = Some(LlmError::Network("activity timed out".to_string()));
            }
        }
        if attempt + 1 < ACTIVITY_MAX_RETRIES {
            let backoff = ACTIVITY_MIN_BACKOFF_SECS.saturating_mul(1 << attempt).min(ACTIVITY_MAX_BACKOFF_SECS);
            tokio::time::sleep(Duration::from_secs(backoff)).await;
        }
    }
    Err(last_error.unwrap_or_else(|| LlmError::Network("exhausted retries".to_string())))
}

struct ToolDecision {
    thought: String,
    tool_name: String,
    tool_args: HashMap<String, JsonValue>,
}

fn parse_tool_decision(raw: &str) -> Result<ToolDecision, String> {
    let trimmed = raw.trim();
    let json_slice = extract_json_object(trimmed).ok_or_else(|| "no JSON object found in response".to_string())?;
    let value: JsonValue = serde_json::from_str(json_slice).map_err(|e| e.to_string())?;

    let thought = value.get("thought").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let tool_name = value
        .get("tool_name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing 'tool_name' field".to_string())?
        .to_string();
    let tool_args = value
        .get("tool_args")
        .and_then(|v| v.as_object())
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default();

    Ok(ToolDecision { thought, tool_name, tool_args })
}

/// Finds the first balanced `{...}` span in `raw`, tolerating leading/trailing
/// prose the LLM sometimes wraps its JSON in.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0i32;
    for (offset, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// `ReactStep(user_query, iteration, trajectory, user_name) -> ReactAgentResult`.
#[instrument(skip(llm, tools, trajectory))]
pub async fn react_step(
    llm: &dyn LlmProvider,
    tools: &ToolRegistry,
    user_query: &str,
    user_name: &str,
    iteration: u32,
    trajectory: &Trajectory,
    domain_fragment: &str,
) -> ReactAgentResult {
    let idx = iteration.saturating_sub(1);
    let engine = PromptTemplateEngine::new();
    let tool_defs = tools.get_all();
    let context = ReasoningContext {
        user_query: user_query.to_string(),
        user_name: user_name.to_string(),
        iteration,
        tool_list: format_tool_list(&tool_defs),
        trajectory_so_far: format_trajectory(trajectory),
        domain_fragment: domain_fragment.to_string(),
    };

    let prompt = match engine.render_reasoning(DEFAULT_REASONING_TEMPLATE, &context) {
        Ok(p) => p,
        Err(err) => {
            return ReactAgentResult {
                status: ReactStatus::Failed,
                trajectory: trajectory.clone(),
                tool_name: String::new(),
                tool_args: HashMap::new(),
                error: Some(err.to_string()),
            }
        }
    };

    let mut new_trajectory = trajectory.clone();

    match call_llm_with_retry(llm, &prompt, &GenerationOptions::default()).await {
        Ok(raw) => match parse_tool_decision(&raw) {
            Ok(decision) => {
                let mut step = TrajectoryStep::new(idx, decision.thought, decision.tool_name.clone(), decision.tool_args.clone());
                step.check_is_finish();
                new_trajectory.push(step);
                ReactAgentResult {
                    status: ReactStatus::Success,
                    trajectory: new_trajectory,
                    tool_name: decision.tool_name,
                    tool_args: decision.tool_args,
                    error: None,
                }
            }
            Err(parse_err) => {
                // Parse failure: record an error slot and force finish so
                // the turn proceeds to extraction instead of looping forever.
                let mut step = TrajectoryStep::new(idx, "(unparseable reasoning output)", "finish", HashMap::new());
                step.error = Some(format!("parse failure: {parse_err}"));
                step.check_is_finish();
                new_trajectory.push(step);
                ReactAgentResult {
                    status: ReactStatus::Success,
                    trajectory: new_trajectory,
                    tool_name: "finish".to_string(),
                    tool_args: HashMap::new(),
                    error: Some(format!("parse failure: {parse_err}")),
                }
            }
        },
        Err(llm_err) => ReactAgentResult {
            status: ReactStatus::Failed,
            trajectory: trajectory.clone(),
            tool_name: String::new(),
            tool_args: HashMap::new(),
            error: Some(llm_err.to_string()),
        },
    }
}

/// `ToolExecute(ToolExecutionRequest) -> ToolExecutionResult`.
#[instrument(skip(registry, mcp_client, mcp_servers, request))]
pub async fn tool_execute(
    registry: &ToolRegistry,
    mcp_client: &McpClient,
    mcp_servers: &HashMap<String, McpServerDescriptor>,
    tool_name_resolution: ToolNameResolution,
    request: ToolExecutionRequest,
) -> ToolExecutionResult {
    let started = Instant::now();
    let idx = request.current_iteration.saturating_sub(1);
    let mut trajectory = request.trajectory;

    let write_outcome = |trajectory: &mut Trajectory, observation: Option<String>, error: Option<String>| {
        if let Some(step) = trajectory.iter_mut().find(|s| s.iteration == idx) {
            step.observation = observation;
            step.error = error;
        }
    };

    let Some(tool) = registry.get(&request.tool_name).cloned() else {
        let message = format!("Error: Unknown tool {}", request.tool_name);
        write_outcome(&mut trajectory, None, Some(message.clone()));
        return ToolExecutionResult {
            success: false,
            trajectory,
            observation_or_error: message,
            execution_time: started.elapsed(),
        };
    };

    let outcome: Result<String, String> = if tool.is_mcp {
        let binding = tool.mcp.as_ref().expect("mcp tool missing binding");
        let server = mcp_servers
            .get(&binding.server_name)
            .cloned()
            .unwrap_or_else(|| McpServerDescriptor::from(binding));
        let envelope = serde_json::json!({ "request": request.tool_args });
        let effective_name = resolve_tool_name(tool_name_resolution, &binding.server_name, &request.tool_name);
        mcp_client.call_tool(&server, &effective_name, envelope).await.map_err(|e| e.to_string())
    } else {
        registry.execute_local(&request.tool_name, &request.tool_args).await.map(|o| o.observation).map_err(|e| e.to_string())
    };

    match outcome {
        Ok(observation) => {
            write_outcome(&mut trajectory, Some(observation.clone()), None);
            ToolExecutionResult { success: true, trajectory, observation_or_error: observation, execution_time: started.elapsed() }
        }
        Err(detail) => {
            let message = format!("Error: {detail}");
            write_outcome(&mut trajectory, None, Some(message.clone()));
            ToolExecutionResult { success: false, trajectory, observation_or_error: message, execution_time: started.elapsed() }
        }
    }
}

/// `ExtractFinal(trajectory, user_query, user_name) -> ExtractAgentResult`.
#[instrument(skip(llm, trajectory))]
pub async fn extract_final(
    llm: &dyn LlmProvider,
    trajectory: &Trajectory,
    user_query: &str,
    user_name: &str,
    domain_fragment: &str,
) -> ExtractAgentResult {
    let engine = PromptTemplateEngine::new();
    let context = ExtractionContext {
        user_query: user_query.to_string(),
        user_name: user_name.to_string(),
        trajectory_flat: format_trajectory(trajectory),
        domain_fragment: domain_fragment.to_string(),
    };

    let prompt = match engine.render_extraction(DEFAULT_EXTRACTION_TEMPLATE, &context) {
        Ok(p) => p,
        Err(err) => {
            return ExtractAgentResult { status: ExtractStatus::Failed, answer: String::new(), reasoning: None, error: Some(err.to_string()) }
        }
    };

    match call_llm_with_retry(llm, &prompt, &GenerationOptions::default()).await {
        Ok(raw) => {
            if let Some(json_slice) = extract_json_object(raw.trim()) {
                if let Ok(value) = serde_json::from_str::<JsonValue>(json_slice) {
                    let answer = value.get("answer").and_then(|v| v.as_str()).unwrap_or("").to_string();
                    let reasoning = value.get("reasoning").and_then(|v| v.as_str()).map(|s| s.to_string());
                    return ExtractAgentResult { status: ExtractStatus::Success, answer, reasoning, error: None };
                }
            }
            // Not structured JSON: treat the raw text itself as the answer.
            ExtractAgentResult { status: ExtractStatus::Success, answer: raw.trim().to_string(), reasoning: None, error: None }
        }
        Err(err) => ExtractAgentResult { status: ExtractStatus::Failed, answer: String::new(), reasoning: None, error: Some(err.to_string()) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tool_registry::{LocalTool, MockLocalTool};
    use crate::domain::llm::{FinishReason, GenerationResponse, TokenUsage};
    use crate::domain::tool::ToolDefinition;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ScriptedLlm {
        responses: std::sync::Mutex<Vec<String>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let text = if responses.is_empty() { "{}".to_string() } else { responses.remove(0) };
            Ok(GenerationResponse {
                text,
                usage: TokenUsage::default(),
                provider: "scripted".to_string(),
                model: "test".to_string(),
                finish_reason: FinishReason::Stop,
            })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn react_step_parses_well_formed_json_decision() {
        let llm = ScriptedLlm {
            responses: std::sync::Mutex::new(vec![
                r#"{"thought": "need weather", "tool_name": "get_weather_forecast", "tool_args": {"latitude": 40.7}}"#.to_string(),
            ]),
            calls: AtomicU32::new(0),
        };
        let registry = ToolRegistry::new(false);
        let result = react_step(&llm, &registry, "weather?", "ada", 1, &Trajectory::new(), "").await;
        assert_eq!(result.status, ReactStatus::Success);
        assert_eq!(result.tool_name, "get_weather_forecast");
        assert_eq!(result.trajectory.len(), 1);
        assert_eq!(result.trajectory[0].iteration, 0);
    }

    #[tokio::test]
    async fn react_step_forces_finish_on_unparseable_output() {
        let llm = ScriptedLlm { responses: std::sync::Mutex::new(vec!["not json at all".to_string()]), calls: AtomicU32::new(0) };
        let registry = ToolRegistry::new(false);
        let result = react_step(&llm, &registry, "weather?", "ada", 1, &Trajectory::new(), "").await;
        assert_eq!(result.tool_name, "finish");
        assert!(result.error.is_some());
        assert_eq!(result.trajectory[0].observation.as_deref(), Some("Completed."));
    }

    #[tokio::test]
    async fn tool_execute_records_unknown_tool_error() {
        let registry = ToolRegistry::new(false);
        let mcp_client = McpClient::new(Arc::new(crate::infrastructure::mcp_transport::DefaultMcpTransport::new()));
        let mut trajectory = Trajectory::new();
        trajectory.push(TrajectoryStep::new(0, "t", "frobnicate", HashMap::new()));
        let request = ToolExecutionRequest { tool_name: "frobnicate".to_string(), tool_args: HashMap::new(), trajectory, current_iteration: 1 };
        let result = tool_execute(&registry, &mcp_client, &HashMap::new(), ToolNameResolution::Direct, request).await;
        assert!(!result.success);
        assert_eq!(result.observation_or_error, "Error: Unknown tool frobnicate");
        assert_eq!(result.trajectory[0].error.as_deref(), Some("Error: Unknown tool frobnicate"));
    }

    #[tokio::test]
    async fn tool_execute_runs_local_tool_and_records_observation() {
        let mut registry = ToolRegistry::new(false);
        let def = ToolDefinition::local("echo", "core", "echoes", vec![]).unwrap();
        let tool: Arc<dyn LocalTool> = Arc::new(MockLocalTool { stub_response: "Forecast: sunny".to_string() });
        registry.register_local(def, tool).unwrap();
        let mcp_client = McpClient::new(Arc::new(crate::infrastructure::mcp_transport::DefaultMcpTransport::new()));
        let mut trajectory = Trajectory::new();
        trajectory.push(TrajectoryStep::new(0, "t", "echo", HashMap::new()));
        let request = ToolExecutionRequest { tool_name: "echo".to_string(), tool_args: HashMap::new(), trajectory, current_iteration: 1 };
        let result = tool_execute(&registry, &mcp_client, &HashMap::new(), ToolNameResolution::Direct, request).await;
        assert!(result.success);
        assert_eq!(result.observation_or_error, "Forecast: sunny");
    }

    #[tokio::test]
    async fn extract_final_parses_structured_answer() {
        let llm = ScriptedLlm { responses: std::sync::Mutex::new(vec![r#"{"answer": "Hello."}"#.to_string()]), calls: AtomicU32::new(0) };
        let result = extract_final(&llm, &Trajectory::new(), "hi", "ada", "").await;
        assert_eq!(result.status, ExtractStatus::Success);
        assert_eq!(result.answer, "Hello.");
    }

    #[tokio::test]
    async fn extract_final_falls_back_to_raw_text_without_json() {
        let llm = ScriptedLlm { responses: std::sync::Mutex::new(vec!["Just plain text.".to_string()]), calls: AtomicU32::new(0) };
        let result = extract_final(&llm, &Trajectory::new(), "hi", "ada", "").await;
        assert_eq!(result.answer, "Just plain text.");
    }
}
