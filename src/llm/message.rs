// SPDX-License-Identifier: AGPL-3.0-or-later

//! Message and conversation types
//!
//! Defines the message structure exchanged with model providers and the
//! per-session conversation state. The conversation owns the invariant that
//! there is always exactly one `system` message and it sits at index 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: Uuid,

    /// Role of the message sender
    pub role: Role,

    /// Content of the message
    pub content: String,

    /// Source function name for `function`-role messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Function call requested by the assistant, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,

    /// Result payload carried by a `function`-role message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_result: Option<FunctionResult>,

    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// System prompt
    System,
    /// Function execution result
    Function,
}

/// A structured function call emitted by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON string (parsed lazily at execution time)
    pub arguments: String,
}

/// The result of an executed function, attached to a `function`-role message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResult {
    /// Function name the result came from
    pub name: String,
    /// Raw result value
    pub result: serde_json::Value,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create an assistant message carrying a function call
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::with_role(Role::Assistant, "")
        }
    }

    /// Create a `function`-role message carrying an execution result
    pub fn function_result(name: impl Into<String>, result: serde_json::Value) -> Self {
        let name = name.into();
        let content = result.to_string();
        Self {
            name: Some(name.clone()),
            function_result: Some(FunctionResult { name, result }),
            ..Self::with_role(Role::Function, content)
        }
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            name: None,
            function_call: None,
            function_result: None,
            timestamp: Utc::now(),
        }
    }

    /// Check whether this message requests a function call
    pub fn has_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
            Role::Function => write!(f, "function"),
        }
    }
}

/// Per-session conversation state.
///
/// Invariant: the message vector always holds exactly one `system` message,
/// at index 0. It is seeded at construction and survives `reset`; `replace`
/// preserves it (or synthesizes one if the replacement set has none).
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a conversation seeded with the given system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// The system message (always present, always first)
    pub fn system_message(&self) -> &Message {
        &self.messages[0]
    }

    /// Conversation history excluding the system message
    pub fn history(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// All messages including the system head, for provider calls
    pub fn all_messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` non-system messages, in chronological order
    pub fn recent(&self, n: usize) -> &[Message] {
        let history = self.history();
        let start = history.len().saturating_sub(n);
        &history[start..]
    }

    /// Append a message.
    ///
    /// A `system`-role message replaces the content of the existing head
    /// instead of being inserted, preserving the single-system invariant.
    pub fn append(&mut self, message: Message) {
        if message.role == Role::System {
            self.messages[0].content = message.content;
            self.messages[0].timestamp = message.timestamp;
            return;
        }
        self.messages.push(message);
    }

    /// Clear the history back to only the system message
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Replace the history wholesale.
    ///
    /// The existing system message stays as head; incoming `system`-role
    /// messages are dropped. If the conversation somehow had no system head
    /// one is synthesized empty.
    pub fn replace(&mut self, messages: Vec<Message>) {
        let head = if !self.messages.is_empty() && self.messages[0].role == Role::System {
            self.messages[0].clone()
        } else {
            Message::system("")
        };
        self.messages = std::iter::once(head)
            .chain(messages.into_iter().filter(|m| m.role != Role::System))
            .collect();
    }

    /// Number of non-system messages
    pub fn len(&self) -> usize {
        self.messages.len() - 1
    }

    /// Check if the history (excluding the system message) is empty
    pub fn is_empty(&self) -> bool {
        self.messages.len() == 1
    }

    /// The last non-system message
    pub fn last(&self) -> Option<&Message> {
        self.history().last()
    }
}
