//! Messages and conversation transcripts
//!
//! This module defines the data that flows through the routing graph. A
//! [`Conversation`] is the append-only transcript a thread accumulates;
//! nodes receive it by value and hand back the messages they want appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The external human participant
    Human,
    /// One of the agents in the graph
    Agent,
    /// The output of a domain tool invoked during an agent's turn
    ToolResult,
}

/// A single message in the transcript. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Name of the agent that produced this message, absent for human input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, origin: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            origin,
            created_at: Utc::now(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content, None)
    }

    pub fn agent(content: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(Role::Agent, content, Some(origin.into()))
    }

    pub fn tool_result(content: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(Role::ToolResult, content, Some(origin.into()))
    }
}

/// The ordered transcript of one conversation thread.
///
/// Owned exclusively by the execution engine for the duration of a turn;
/// nodes get a shared reference and never mutate it directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a single message. Insertion order is the transcript order.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends a batch of messages, preserving their order.
    pub fn extend(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
    }
}
