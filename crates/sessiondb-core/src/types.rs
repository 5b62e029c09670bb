// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session document model.
//!
//! One [`Session`] document holds everything about a conversation: metadata,
//! every agent with its message history, and the feedback log. Nothing is
//! stored outside the document, so a session is always read and written as
//! a unit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::metadata::Metadata;

/// Default classification for sessions created without an explicit type.
pub const DEFAULT_SESSION_TYPE: &str = "agent";

/// Root document, keyed by a caller-supplied `session_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub session_type: String,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub agents: BTreeMap<String, SessionAgent>,
    #[serde(default)]
    pub feedbacks: Vec<Feedback>,
}

impl Session {
    /// A fresh, empty session document stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        session_type: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let now = crate::timestamp::now();
        Self {
            session_id: session_id.into(),
            session_type: session_type.into(),
            created_at: now,
            updated_at: now,
            metadata,
            agents: BTreeMap::new(),
            feedbacks: Vec::new(),
        }
    }

    /// Total number of messages across every agent.
    pub fn message_count(&self) -> usize {
        self.agents.values().map(|a| a.messages.len()).sum()
    }
}

/// A named participant within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAgent {
    pub agent_id: String,
    #[serde(default)]
    pub agent_data: AgentData,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Opaque agent state plus the model configuration, when the runtime has one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    /// Custom key/value state kept by the agent runtime.
    #[serde(default)]
    pub state: serde_json::Value,
    /// Conversation-manager state (window sizes, summaries, removed counts).
    #[serde(default)]
    pub conversation_manager_state: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// The role of the participant that authored a [`Message`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One content block of a message.
///
/// Blocks are opaque to the engine; the constructors only exist so callers
/// and tests do not have to spell out the JSON shapes by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentBlock(pub serde_json::Value);

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::json!({ "text": text.into() }))
    }

    pub fn tool_use(tool_use_id: &str, name: &str, input: serde_json::Value) -> Self {
        Self(serde_json::json!({
            "toolUse": { "toolUseId": tool_use_id, "name": name, "input": input }
        }))
    }

    pub fn tool_result(tool_use_id: &str, status: &str, content: serde_json::Value) -> Self {
        Self(serde_json::json!({
            "toolResult": { "toolUseId": tool_use_id, "status": status, "content": content }
        }))
    }

    /// The text of a text block, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        self.0.get("text").and_then(serde_json::Value::as_str)
    }
}

/// Token and latency telemetry captured after a full response cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLoopMetrics {
    pub latency_ms: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// One turn in an agent's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: u64,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_loop_metrics: Option<EventLoopMetrics>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub redacted: bool,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Drop operational telemetry before handing the message to a
    /// conversation-history consumer.
    pub fn without_metrics(mut self) -> Self {
        self.event_loop_metrics = None;
        self
    }
}

/// A message as supplied by the agent runtime, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl NewMessage {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    /// A single-text-block message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![ContentBlock::text(text)])
    }
}

/// Fields of a stored message that may be changed after it was appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<Vec<ContentBlock>>,
    pub event_loop_metrics: Option<EventLoopMetrics>,
}

impl MessagePatch {
    pub fn content(content: Vec<ContentBlock>) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn metrics(metrics: EventLoopMetrics) -> Self {
        Self {
            event_loop_metrics: Some(metrics),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.event_loop_metrics.is_none()
    }
}

/// A thumbs-up / thumbs-down rating. An absent rating is `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

/// A rating/comment attached to the session as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: Option<Rating>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}
