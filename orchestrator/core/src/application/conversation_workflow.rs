// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Conversation workflow (C5): a long-lived, per-`workflow_id` state machine
//! with signals (asynchronous, at-most-once) and queries (synchronous,
//! read-only). Modeled as a Tokio task draining an mpsc signal channel and
//! publishing query-visible state through a `tokio::sync::RwLock`-guarded
//! snapshot that no query path ever writes to.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, instrument};

use crate::domain::classification::{classify_message, MessageType};
use crate::domain::conversation::ConversationState;
use crate::domain::llm::LlmProvider;
use crate::domain::mcp::{McpServerDescriptor, ToolNameResolution};
use crate::domain::message::Role;
use crate::domain::repository::ConversationRepository;
use crate::domain::trajectory::{Trajectory, TrajectoryStep};
use crate::domain::workflow::{ConversationStateView, WorkflowDetails, WorkflowId, WorkflowStatus};

use crate::application::activities::extract_final;
use crate::application::agentic_workflow::run_agent_turn;
use crate::application::mcp_client::McpClient;
use crate::application::tool_registry::ToolRegistry;

/// Per-conversation history cap applied after every turn (spec §4.5); looser
/// than, and enforced independently of, `ConversationState`'s own hard 1000
/// ceiling.
pub const SOFT_HISTORY_CAP: usize = 100;
/// How many recent turn trajectories the `trajectories` query retains.
pub const RETAINED_TRAJECTORIES: usize = 50;

#[derive(Debug, Clone)]
pub enum ConversationSignal {
    Prompt(String),
    EndChat,
    RequestSummary,
}

struct Snapshot {
    status: WorkflowStatus,
    state: ConversationState,
    query_count: u64,
    trajectories: VecDeque<Trajectory>,
    started_at: Instant,
}

/// Handle returned to the engine (C6/C7): the signal sender plus a read
/// handle to query-visible state. Cloning is cheap — both fields are `Arc`s.
#[derive(Clone)]
pub struct ConversationHandle {
    pub workflow_id: WorkflowId,
    signal_tx: mpsc::UnboundedSender<ConversationSignal>,
    snapshot: Arc<RwLock<Snapshot>>,
    tools: Arc<ToolRegistry>,
}

impl ConversationHandle {
    pub fn signal(&self, signal: ConversationSignal) -> bool {
        self.signal_tx.send(signal).is_ok()
    }

    pub async fn query_status(&self) -> WorkflowStatus {
        self.snapshot.read().await.status
    }

    pub async fn query_state(&self, include_history: bool) -> ConversationStateView {
        let snapshot = self.snapshot.read().await;
        ConversationStateView {
            status: snapshot.status,
            last_response: snapshot.state.messages.iter().rev().find(|m| m.role == Role::Agent).map(|m| m.content.clone()),
            conversation_history: include_history.then(|| snapshot.state.messages.clone()),
        }
    }

    pub async fn query_history(&self) -> Vec<crate::domain::message::Message> {
        self.snapshot.read().await.state.messages.clone()
    }

    pub async fn query_trajectories(&self) -> Vec<Trajectory> {
        self.snapshot.read().await.trajectories.iter().cloned().collect()
    }

    pub async fn query_workflow_details(&self) -> WorkflowDetails {
        let snapshot = self.snapshot.read().await;
        let trajectory_keys = snapshot
            .trajectories
            .back()
            .map(|t| flatten_trajectory_keys(t))
            .unwrap_or_default();
        WorkflowDetails {
            status: snapshot.status,
            message_count: snapshot.state.messages.len(),
            interaction_count: snapshot.state.interaction_count,
            tools_used: snapshot.state.tools_used.clone(),
            execution_time_ms: snapshot.started_at.elapsed().as_millis(),
            trajectory_keys,
        }
    }

    pub async fn query_count(&self) -> u64 {
        self.snapshot.read().await.query_count
    }

    /// Every tool this conversation's turns can dispatch to, local or MCP.
    pub fn query_tools(&self) -> Vec<crate::domain::tool::ToolDefinition> {
        self.tools.get_all().into_iter().cloned().collect()
    }
}

fn flatten_trajectory_keys(trajectory: &Trajectory) -> Vec<String> {
    trajectory
        .iter()
        .flat_map(|step| {
            let mut keys = vec![format!("thought_{}", step.iteration), format!("tool_name_{}", step.iteration)];
            if step.observation.is_some() {
                keys.push(format!("observation_{}", step.iteration));
            }
            if step.error.is_some() {
                keys.push(format!("error_{}", step.iteration));
            }
            keys
        })
        .collect()
}

/// Dependencies threaded explicitly into the run loop rather than read from
/// global state (spec §9 design note, applied uniformly across C3-C5).
pub struct ConversationDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub tools: Arc<ToolRegistry>,
    pub mcp_client: Arc<McpClient>,
    pub mcp_servers: Arc<HashMap<String, McpServerDescriptor>>,
    pub repository: Arc<dyn ConversationRepository>,
    pub domain_fragment: String,
    pub tool_name_resolution: ToolNameResolution,
}

/// Spawns the conversation workflow as a background task and returns a
/// handle for signalling and querying it. Mirrors C6's "start one on the
/// fixed task queue and send the initial prompt as a signal" by accepting
/// the initial prompt directly.
pub fn spawn(workflow_id: WorkflowId, user_name: String, initial_message: String, deps: ConversationDeps) -> ConversationHandle {
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let snapshot = Arc::new(RwLock::new(Snapshot {
        status: WorkflowStatus::Running,
        state: ConversationState::new(),
        query_count: 0,
        trajectories: VecDeque::new(),
        started_at: Instant::now(),
    }));

    let handle = ConversationHandle { workflow_id: workflow_id.clone(), signal_tx, snapshot: snapshot.clone(), tools: deps.tools.clone() };

    tokio::spawn(run_loop(workflow_id, user_name, initial_message, deps, signal_rx, snapshot));

    handle
}

#[instrument(skip(deps, signal_rx, snapshot, initial_message))]
async fn run_loop(
    workflow_id: WorkflowId,
    user_name: String,
    initial_message: String,
    deps: ConversationDeps,
    mut signal_rx: mpsc::UnboundedReceiver<ConversationSignal>,
    snapshot: Arc<RwLock<Snapshot>>,
) {
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut should_end = false;
    let mut pending_summary_request = false;
    queue.push_back(initial_message);

    loop {
        if queue.is_empty() && !should_end {
            match signal_rx.recv().await {
                Some(signal) => apply_signal(signal, &mut queue, &mut should_end, &mut pending_summary_request),
                None => break,
            }
        } else {
            while let Ok(signal) = signal_rx.try_recv() {
                apply_signal(signal, &mut queue, &mut should_end, &mut pending_summary_request);
            }
        }

        if queue.is_empty() {
            if should_end {
                let mut snap = snapshot.write().await;
                snap.status = WorkflowStatus::Ended;
                info!(workflow_id = %workflow_id, "conversation workflow ended");
                break;
            }
            continue;
        }

        let message = queue.pop_front().expect("checked non-empty above");
        let classification = classify_message(&message);

        let mut summary_requested =
            classification.message_type == MessageType::SummaryRequest || pending_summary_request;
        pending_summary_request = false;
        {
            let mut snap = snapshot.write().await;
            if snap.state.add_message(Role::User, message.clone()).is_err() {
                continue;
            }
            if summary_requested {
                snap.state.summary_requested = true;
            }
            summary_requested = snap.state.summary_requested;
        }

        let turn = run_agent_turn(
            deps.llm.as_ref(),
            deps.tools.as_ref(),
            deps.mcp_client.as_ref(),
            deps.mcp_servers.as_ref(),
            deps.tool_name_resolution,
            &message,
            &user_name,
            &deps.domain_fragment,
        )
        .await;

        let history_snapshot;
        let state_snapshot;
        {
            let mut snap = snapshot.write().await;
            let _ = snap.state.add_message(Role::Agent, turn.message.clone());
            for step in &turn.trajectory {
                snap.state.record_tool_use(step.tool_name.clone());
            }
            snap.state.trim_to(SOFT_HISTORY_CAP);
            snap.query_count += 1;
            snap.trajectories.push_back(turn.trajectory.clone());
            if snap.trajectories.len() > RETAINED_TRAJECTORIES {
                snap.trajectories.pop_front();
            }
            history_snapshot = snap.state.messages.clone();
            state_snapshot = snap.state.clone();
        }

        let _ = deps.repository.save(&workflow_id, &state_snapshot).await;
        let _ = deps.repository.append_trajectory(&workflow_id, turn.trajectory.clone()).await;

        if summary_requested {
            let flattened = messages_as_trajectory(&history_snapshot);
            let summary_result = extract_final(deps.llm.as_ref(), &flattened, &message, &user_name, &deps.domain_fragment).await;
            let mut snap = snapshot.write().await;
            snap.state.summary = Some(summary_result.answer);
            snap.state.summary_requested = false;
        }
    }
}

fn apply_signal(signal: ConversationSignal, queue: &mut VecDeque<String>, should_end: &mut bool, pending_summary_request: &mut bool) {
    match signal {
        ConversationSignal::Prompt(text) => queue.push_back(text),
        ConversationSignal::EndChat => *should_end = true,
        ConversationSignal::RequestSummary => *pending_summary_request = true,
    }
}

/// Projects a flat message history into a pseudo-trajectory so
/// `ExtractFinal` can summarise it with the same activity used for per-turn
/// extraction (spec §4.5 step 5).
fn messages_as_trajectory(messages: &[crate::domain::message::Message]) -> Trajectory {
    messages
        .iter()
        .enumerate()
        .map(|(idx, message)| {
            let mut step = TrajectoryStep::new(idx as u32, message.role.as_str(), "summarize", HashMap::new());
            step.observation = Some(message.content.clone());
            step
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{FinishReason, GenerationOptions, GenerationResponse, LlmError};
    use crate::infrastructure::repositories::InMemoryConversationRepository;
    use async_trait::async_trait;
    use tokio::time::{sleep, Duration};

    struct AlwaysFinishLlm;

    #[async_trait]
    impl LlmProvider for AlwaysFinishLlm {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
            let text = if prompt.contains("Respond with a JSON object: {\"thought\"") {
                r#"{"thought": "done", "tool_name": "finish", "tool_args": {}}"#.to_string()
            } else {
                r#"{"answer": "Hello."}"#.to_string()
            };
            Ok(GenerationResponse { text, usage: Default::default(), provider: "test".to_string(), model: "test".to_string(), finish_reason: FinishReason::Stop })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn test_deps() -> ConversationDeps {
        ConversationDeps {
            llm: Arc::new(AlwaysFinishLlm),
            tools: Arc::new(ToolRegistry::new(false)),
            mcp_client: Arc::new(McpClient::new(Arc::new(crate::infrastructure::mcp_transport::DefaultMcpTransport::new()))),
            mcp_servers: Arc::new(HashMap::new()),
            repository: Arc::new(InMemoryConversationRepository::new()),
            domain_fragment: String::new(),
            tool_name_resolution: ToolNameResolution::Direct,
        }
    }

    #[tokio::test]
    async fn prompt_signal_appends_user_message_visible_in_history() {
        let id = WorkflowId::new("durable-agent-test-1").unwrap();
        let handle = spawn(id, "ada".to_string(), "hello".to_string(), test_deps());
        sleep(Duration::from_millis(50)).await;
        let history = handle.query_history().await;
        assert_eq!(history.first().unwrap().content, "hello");
        assert_eq!(history.last().unwrap().content, "Hello.");
    }

    #[tokio::test]
    async fn second_prompt_produces_four_messages_in_order() {
        let id = WorkflowId::new("durable-agent-test-2").unwrap();
        let handle = spawn(id, "ada".to_string(), "hello".to_string(), test_deps());
        sleep(Duration::from_millis(50)).await;
        handle.signal(ConversationSignal::Prompt("again".to_string()));
        sleep(Duration::from_millis(50)).await;
        let history = handle.query_history().await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Agent);
        assert_eq!(history[2].role, Role::User);
        assert_eq!(history[3].role, Role::Agent);
        assert_eq!(history[2].content, "again");
    }

    #[tokio::test]
    async fn end_chat_drains_queue_then_ends() {
        let id = WorkflowId::new("durable-agent-test-3").unwrap();
        let handle = spawn(id, "ada".to_string(), "hello".to_string(), test_deps());
        handle.signal(ConversationSignal::EndChat);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.query_status().await, WorkflowStatus::Ended);
    }

    #[tokio::test]
    async fn queries_do_not_mutate_state() {
        let id = WorkflowId::new("durable-agent-test-4").unwrap();
        let handle = spawn(id, "ada".to_string(), "hello".to_string(), test_deps());
        sleep(Duration::from_millis(50)).await;
        let first = handle.query_history().await;
        let second = handle.query_history().await;
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn query_tools_reflects_the_registry_the_turn_dispatches_against() {
        let mut deps = test_deps();
        let def = crate::domain::tool::ToolDefinition::local("echo", "core", "echoes", vec![]).unwrap();
        Arc::get_mut(&mut deps.tools)
            .unwrap()
            .register_local(def, Arc::new(crate::application::tool_registry::MockLocalTool { stub_response: "ok".to_string() }))
            .unwrap();
        let id = WorkflowId::new("durable-agent-test-5").unwrap();
        let handle = spawn(id, "ada".to_string(), "hello".to_string(), deps);
        let tools = handle.query_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
    }
}
