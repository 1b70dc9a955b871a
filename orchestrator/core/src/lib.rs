// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # durable-agent-core
//!
//! Runtime heart of the durable agentic orchestrator: a chat-facing system in
//! which each conversation is backed by a long-lived workflow whose message
//! log, reasoning trajectories, and tool outcomes survive process restarts.
//! Each user turn drives a ReAct loop — reasoning, acting, observing — until
//! the agent emits `finish` or an iteration cap is reached, followed by an
//! extraction step that synthesises the user-facing answer.
//!
//! ## Layer structure
//!
//! ```text
//! application/    ← conversation workflow, agentic sub-workflow, activities, engine
//!     ↓
//! domain/         ← messages, trajectories, tool contracts, repository traits
//!     ↓
//! infrastructure/ ← in-memory repository, MCP transports, LLM provider adapters
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
