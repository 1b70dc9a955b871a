// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod activities;
pub mod agentic_workflow;
pub mod conversation_workflow;
pub mod mcp_client;
pub mod tool_registry;
pub mod workflow_engine;
pub mod workflow_service;
