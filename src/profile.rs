// SPDX-License-Identifier: AGPL-3.0-or-later

//! User and business context carried through requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What we know about the person talking to the assistant.
///
/// Everything here is optional enrichment. A bare context with only an id is
/// valid and common for first-time visitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    /// Stable user identifier
    pub user_id: String,

    /// Stated or learned preferences ("oat milk", "prefers decaf after noon")
    #[serde(default)]
    pub preferences: Vec<String>,

    /// Recent notable interactions ("ordered a cappuccino on Tuesday")
    #[serde(default)]
    pub interactions: Vec<String>,

    /// Last visit, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<DateTime<Utc>>,

    /// Dietary restrictions ("lactose intolerant", "vegan")
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}

impl UserContext {
    /// Create a minimal context for the given user id
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferences: Vec::new(),
            interactions: Vec::new(),
            last_visit: None,
            dietary_restrictions: Vec::new(),
        }
    }

    /// Add a preference, builder style
    pub fn with_preference(mut self, pref: impl Into<String>) -> Self {
        self.preferences.push(pref.into());
        self
    }

    /// Add a dietary restriction, builder style
    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.dietary_restrictions.push(restriction.into());
        self
    }

    /// Render the context as a compact block for prompt templates
    pub fn as_prompt_block(&self) -> String {
        let mut out = format!("User: {}", self.user_id);
        if !self.preferences.is_empty() {
            out.push_str(&format!("\nPreferences: {}", self.preferences.join(", ")));
        }
        if !self.dietary_restrictions.is_empty() {
            out.push_str(&format!(
                "\nDietary restrictions: {}",
                self.dietary_restrictions.join(", ")
            ));
        }
        if !self.interactions.is_empty() {
            out.push_str(&format!(
                "\nRecent interactions: {}",
                self.interactions.join("; ")
            ));
        }
        if let Some(visit) = self.last_visit {
            out.push_str(&format!("\nLast visit: {}", visit.format("%Y-%m-%d")));
        }
        out
    }
}

/// The business the assistant speaks for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessProfile {
    /// Display name
    pub name: String,
    /// Short description used in the system prompt
    pub description: String,
    /// Desired voice ("warm and informal")
    pub tone: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: "Cortado".to_string(),
            description: "A neighborhood café serving coffee, tea, and fresh pastries."
                .to_string(),
            tone: "warm, concise, and helpful".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_context() {
        let user = UserContext::new("u-42");
        assert_eq!(user.user_id, "u-42");
        assert!(user.preferences.is_empty());
        assert_eq!(user.as_prompt_block(), "User: u-42");
    }

    #[test]
    fn test_prompt_block_includes_enrichment() {
        let user = UserContext::new("u-42")
            .with_preference("oat milk")
            .with_restriction("lactose intolerant");

        let block = user.as_prompt_block();
        assert!(block.contains("oat milk"));
        assert!(block.contains("lactose intolerant"));
    }

    #[test]
    fn test_context_deserializes_with_missing_fields() {
        let user: UserContext = serde_json::from_str(r#"{"user_id":"u-1"}"#).unwrap();
        assert_eq!(user.user_id, "u-1");
        assert!(user.interactions.is_empty());
        assert!(user.last_visit.is_none());
    }
}
