// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Advisory classification of inbound prompts. Does not change the
//! conversation workflow's hard behaviour — a `SummaryRequest` classification
//! is a hint the run loop may act on (setting `summary_requested`), not a
//! substitute for the `request_summary` signal.

const CONFIRMATION_WORDS: [&str; 4] = ["yes", "confirm", "proceed", "ok"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    UserQuery,
    ToolConfirmation,
    SystemNotification,
    SummaryRequest,
}

#[derive(Debug, Clone)]
pub struct ClassifiedMessage {
    pub content: String,
    pub message_type: MessageType,
    pub confidence: f32,
    pub keywords_matched: Vec<String>,
}

/// Classifies a prompt's content based on a small set of heuristics, in
/// priority order: system prefix, exact confirmation word, summary keyword,
/// else a plain user query.
pub fn classify_message(message: &str) -> ClassifiedMessage {
    let lower = message.to_lowercase();
    let mut keywords_matched = Vec::new();

    let (message_type, confidence) = if lower.starts_with("###") {
        keywords_matched.push("###".to_string());
        (MessageType::SystemNotification, 1.0)
    } else if CONFIRMATION_WORDS.contains(&lower.as_str()) {
        keywords_matched.push(lower.clone());
        (MessageType::ToolConfirmation, 1.0)
    } else if lower.contains("summary") || lower.contains("summarize") {
        for kw in ["summary", "summarize"] {
            if lower.contains(kw) {
                keywords_matched.push(kw.to_string());
            }
        }
        (MessageType::SummaryRequest, 0.9)
    } else {
        (MessageType::UserQuery, 0.8)
    };

    ClassifiedMessage {
        content: message.to_string(),
        message_type,
        confidence,
        keywords_matched,
    }
}
