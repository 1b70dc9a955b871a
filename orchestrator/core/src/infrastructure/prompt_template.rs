// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Renders the reasoning and extraction prompts handed to the LLM oracle,
//! using Handlebars for placeholder substitution against the current turn's
//! tool list and trajectory.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use crate::domain::tool::ToolDefinition;
use crate::domain::trajectory::Trajectory;

/// Context handed to the reasoning prompt: everything `ReactStep` needs to
/// project into a single string for the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningContext {
    pub user_query: String,
    pub user_name: String,
    pub iteration: u32,
    pub tool_list: String,
    pub trajectory_so_far: String,
    pub domain_fragment: String,
}

/// Context handed to the extraction prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionContext {
    pub user_query: String,
    pub user_name: String,
    pub trajectory_flat: String,
    pub domain_fragment: String,
}

pub const DEFAULT_REASONING_TEMPLATE: &str = "\
You are an assistant helping {{user_name}}. Answer by choosing exactly one tool.

Available tools:
{{tool_list}}
finish: call this when you have enough information to answer. Takes no arguments.

{{#if domain_fragment}}{{domain_fragment}}\n\n{{/if}}\
Question: {{user_query}}

Trajectory so far (iteration {{iteration}}):
{{trajectory_so_far}}

Respond with a JSON object: {\"thought\": <string>, \"tool_name\": <string>, \"tool_args\": <object>}.";

pub const DEFAULT_EXTRACTION_TEMPLATE: &str = "\
You are summarising the outcome of a tool-using turn for {{user_name}}.

{{#if domain_fragment}}{{domain_fragment}}\n\n{{/if}}\
Question: {{user_query}}

Trajectory:
{{trajectory_flat}}

Respond with a JSON object: {\"answer\": <string>, \"reasoning\": <string, optional>}.";

pub struct PromptTemplateEngine {
    handlebars: Handlebars<'static>,
}

impl PromptTemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        Self { handlebars }
    }

    pub fn render_reasoning(&self, template: &str, context: &ReasoningContext) -> Result<String> {
        self.handlebars.render_template(template, context).context("failed to render reasoning prompt")
    }

    pub fn render_extraction(&self, template: &str, context: &ExtractionContext) -> Result<String> {
        self.handlebars.render_template(template, context).context("failed to render extraction prompt")
    }
}

impl Default for PromptTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_tool_list(tools: &[&ToolDefinition]) -> String {
    tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flattens a trajectory into the same `thought_N`/`tool_name_N`/`observation_N`
/// string projection the original dictionary-based prompt format used, purely
/// at this serialization boundary (see design notes on dynamic trajectory keys).
pub fn format_trajectory(trajectory: &Trajectory) -> String {
    if trajectory.is_empty() {
        return "(none yet)".to_string();
    }
    trajectory
        .iter()
        .map(|step| {
            let mut lines = vec![
                format!("thought_{}: {}", step.iteration, step.thought),
                format!("tool_name_{}: {}", step.iteration, step.tool_name),
            ];
            if let Some(obs) = &step.observation {
                lines.push(format!("observation_{}: {}", step.iteration, obs));
            }
            if let Some(err) = &step.error {
                lines.push(format!("error_{}: {}", step.iteration, err));
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_prompt_embeds_tool_list_and_query() {
        let engine = PromptTemplateEngine::new();
        let ctx = ReasoningContext {
            user_query: "what's the weather?".to_string(),
            user_name: "ada".to_string(),
            iteration: 1,
            tool_list: "get_weather_forecast: fetches a forecast".to_string(),
            trajectory_so_far: "(none yet)".to_string(),
            domain_fragment: String::new(),
        };
        let rendered = engine.render_reasoning(DEFAULT_REASONING_TEMPLATE, &ctx).unwrap();
        assert!(rendered.contains("get_weather_forecast"));
        assert!(rendered.contains("what's the weather?"));
    }

    #[test]
    fn trajectory_formatting_includes_observations_and_errors() {
        use crate::domain::trajectory::TrajectoryStep;
        use std::collections::HashMap;

        let mut step = TrajectoryStep::new(0, "thinking", "frobnicate", HashMap::new());
        step.error = Some("Unknown tool frobnicate".to_string());
        let formatted = format_trajectory(&vec![step]);
        assert!(formatted.contains("error_0: Unknown tool frobnicate"));
    }
}
