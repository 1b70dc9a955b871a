// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod llm;
pub mod mcp_transport;
pub mod prompt_template;
pub mod repositories;
pub mod telemetry;
