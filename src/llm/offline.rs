// SPDX-License-Identifier: AGPL-3.0-or-later

//! Deterministic offline provider
//!
//! Serves as the registry's safe fallback and lets the binary run without any
//! backend configured. Responses depend only on the message set, so the same
//! input always yields the same output. The reply never repeats the input
//! text back: downstream parsing (function selection, substring fallback)
//! scans replies for known names, and echoing a prompt that lists them would
//! select everything.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::message::{Message, Role};
use crate::llm::provider::AiProvider;

/// Provider that answers without any network access
pub struct OfflineProvider;

impl OfflineProvider {
    /// Create an offline provider
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl AiProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    async fn send_message(&self, messages: &[Message]) -> Result<String> {
        // Function-role messages in the tail mean we were asked to ground a
        // reply; restate the facts rather than inventing anything.
        let facts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::Function)
            .map(|m| m.content.as_str())
            .collect();
        if !facts.is_empty() {
            return Ok(format!("Here is what I found: {}", facts.join("; ")));
        }

        let has_user_turn = messages
            .iter()
            .any(|m| m.role == Role::User && !m.content.trim().is_empty());
        if !has_user_turn {
            return Ok("Hello! How can I help you today?".to_string());
        }

        Ok("I'm currently offline, but I'm happy to help with our menu, \
            our retail products, and your loyalty points. What would you like to know?"
            .to_string())
    }
}
