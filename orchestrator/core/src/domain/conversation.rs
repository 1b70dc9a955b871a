// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::message::{Message, MessageError, Role};

/// Hard ceiling on retained messages (spec invariant: `len(messages) <= 1000`).
pub const MAX_MESSAGES: usize = 1000;
/// Target length messages are trimmed down to once the ceiling is exceeded.
pub const TRIM_TO: usize = 100;

/// Per-session conversation state. Owned exclusively by one conversation
/// workflow instance for the lifetime of that session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub tools_used: Vec<String>,
    pub user_context: HashMap<String, JsonValue>,
    pub summary: Option<String>,
    pub interaction_count: u64,
    pub summary_requested: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, bumps `interaction_count`, and enforces the
    /// retention invariants. This is the only mutation path that adds
    /// messages, so the invariants below cannot be violated from outside
    /// this module.
    pub fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<(), MessageError> {
        let message = Message::new(role, content, HashMap::new())?;
        self.messages.push(message);
        self.interaction_count += 1;
        self.enforce_retention();
        Ok(())
    }

    /// Drops the oldest messages down to `TRIM_TO` once `MAX_MESSAGES` is
    /// exceeded. The `1000` figure in the data model is a hard invariant
    /// enforced here by construction, never by the caller.
    fn enforce_retention(&mut self) {
        if self.messages.len() > MAX_MESSAGES {
            self.trim_to(TRIM_TO);
        }
    }

    /// Drops the oldest messages down to `cap` if currently over it. Used by
    /// the conversation workflow's run loop to apply its own, looser
    /// per-turn history cap (100) on top of the hard 1000-message ceiling
    /// enforced unconditionally above.
    pub fn trim_to(&mut self, cap: usize) {
        if self.messages.len() > cap {
            let drop = self.messages.len() - cap;
            self.messages.drain(0..drop);
        }
    }

    pub fn record_tool_use(&mut self, tool_name: impl Into<String>) {
        self.tools_used.push(tool_name.into());
    }

    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    pub fn agent_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::Agent).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforces_message_ceiling_by_trimming_to_target() {
        let mut state = ConversationState::new();
        for i in 0..1005 {
            state.add_message(Role::User, format!("m{i}")).unwrap();
        }
        assert!(state.messages.len() <= MAX_MESSAGES);
        assert_eq!(state.messages.len(), TRIM_TO);
        // the most recent message survives trimming
        assert_eq!(state.messages.last().unwrap().content, "m1004");
    }

    #[test]
    fn interaction_count_tracks_every_append() {
        let mut state = ConversationState::new();
        state.add_message(Role::User, "hi").unwrap();
        state.add_message(Role::Agent, "hello").unwrap();
        assert_eq!(state.interaction_count, 2);
        assert_eq!(state.user_message_count() + state.agent_message_count(), 2);
    }
}
