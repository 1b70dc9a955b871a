// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_CONTENT_LEN: usize = 1;
pub const MAX_CONTENT_LEN: usize = 50_000;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message content must be between {MIN_CONTENT_LEN} and {MAX_CONTENT_LEN} characters, got {0}")]
    InvalidLength(usize),
}

/// Who produced a message. Mirrors the three actor types the conversation
/// loop distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
        }
    }
}

/// A single, immutable entry in a conversation's history.
///
/// Once constructed a `Message` cannot be mutated — `ConversationState`
/// only ever appends new messages, never edits existing ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, JsonValue>,
}

impl Message {
    pub fn new(
        role: Role,
        content: impl Into<String>,
        metadata: HashMap<String, JsonValue>,
    ) -> Result<Self, MessageError> {
        let content = content.into();
        let len = content.chars().count();
        if !(MIN_CONTENT_LEN..=MAX_CONTENT_LEN).contains(&len) {
            return Err(MessageError::InvalidLength(len));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            metadata,
        })
    }

    pub fn user(content: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(Role::User, content, HashMap::new())
    }

    pub fn agent(content: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(Role::Agent, content, HashMap::new())
    }

    pub fn system(content: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(Role::System, content, HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_content() {
        assert!(Message::user("").is_err());
    }

    #[test]
    fn rejects_oversized_content() {
        let huge = "a".repeat(MAX_CONTENT_LEN + 1);
        assert!(Message::user(huge).is_err());
    }

    #[test]
    fn accepts_boundary_lengths() {
        assert!(Message::user("a").is_ok());
        assert!(Message::user("a".repeat(MAX_CONTENT_LEN)).is_ok());
    }

    #[test]
    fn role_round_trips_through_json() {
        let msg = Message::agent("hi").unwrap();
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Agent);
        assert_eq!(back.content, "hi");
    }
}
