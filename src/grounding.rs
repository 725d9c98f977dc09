// SPDX-License-Identifier: AGPL-3.0-or-later

//! Grounding service
//!
//! Builds a fact bundle from function results and the user profile, renders
//! it into a "do not invent facts" instruction, and asks the provider for
//! the final reply. Only the last few turns of conversation travel with the
//! prompt to keep its size bounded. A provider failure becomes a fixed
//! apology, never an error.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::llm::message::{Conversation, Message, Role};
use crate::llm::provider::AiProvider;
use crate::orchestrator::ExecutedFunction;
use crate::profile::UserContext;
use crate::services::{PromptTemplateService, TEMPLATE_RAG_CONTEXT};

/// How many recent non-system messages accompany the grounding prompt
pub const HISTORY_WINDOW: usize = 6;

/// Fallback when the provider cannot produce a grounded reply
pub const GROUNDING_FALLBACK: &str =
    "I'm sorry, I'm having trouble answering right now. Please try again in a moment.";

/// Produces fact-constrained replies
pub struct GroundingService {
    templates: Arc<dyn PromptTemplateService>,
}

impl GroundingService {
    /// Create a grounding service
    pub fn new(templates: Arc<dyn PromptTemplateService>) -> Self {
        Self { templates }
    }

    /// Fact bundle: function results keyed by source, plus user context and
    /// free-form extra context.
    pub fn build_facts(
        &self,
        executed: &[ExecutedFunction],
        user: &UserContext,
        extra_context: Option<&str>,
    ) -> Value {
        let mut results = Map::new();
        for e in executed {
            results.insert(e.function_name.clone(), e.result.to_value());
        }

        let mut facts = Map::new();
        facts.insert("function_results".to_string(), Value::Object(results));
        facts.insert("user".to_string(), json!(user.as_prompt_block()));
        if let Some(extra) = extra_context {
            facts.insert("extra_context".to_string(), json!(extra));
        }
        Value::Object(facts)
    }

    /// Ask the provider for the final grounded reply.
    ///
    /// Empty executed sets are fine: grounding proceeds on user context
    /// alone.
    pub async fn grounded_reply(
        &self,
        provider: &dyn AiProvider,
        conversation: &Conversation,
        user_message: &str,
        executed: &[ExecutedFunction],
        user: &UserContext,
        extra_context: Option<&str>,
    ) -> String {
        let facts = self.build_facts(executed, user, extra_context);

        let history_text = conversation
            .recent(HISTORY_WINDOW)
            .iter()
            .filter(|m| m.role == Role::User || m.role == Role::Assistant)
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = match self.templates.prompt(
            TEMPLATE_RAG_CONTEXT,
            &json!({
                "facts": serde_json::to_string_pretty(&facts).unwrap_or_default(),
                "history": history_text,
                "user_context": user.as_prompt_block(),
                "message": user_message,
            }),
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(target: "cortado.grounding", error = %e, "grounding template failed");
                return GROUNDING_FALLBACK.to_string();
            }
        };

        // The instruction goes in as the system head of a fresh message set,
        // followed by the bounded window of real conversation.
        let mut messages = vec![Message::system(prompt)];
        messages.extend(conversation.recent(HISTORY_WINDOW).iter().cloned());

        match provider.send_message(&messages).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                tracing::warn!(target: "cortado.grounding", "provider returned empty reply");
                GROUNDING_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::warn!(target: "cortado.grounding", error = %e, "provider failed, using fallback");
                GROUNDING_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionCallResult;
    use crate::llm::mock_provider::{MockProvider, MockResponse};
    use crate::services::static_data::StaticTemplates;

    fn service() -> GroundingService {
        GroundingService::new(Arc::new(StaticTemplates::new()))
    }

    fn executed(name: &str, data: Value) -> ExecutedFunction {
        ExecutedFunction {
            function_name: name.to_string(),
            result: FunctionCallResult::success(data),
        }
    }

    #[test]
    fn test_facts_keyed_by_source() {
        let service = service();
        let user = UserContext::new("u-1").with_preference("oat milk");
        let facts = service.build_facts(
            &[executed("get_loyalty_points", json!({"points": 12}))],
            &user,
            Some("store closes at 18:00"),
        );

        assert_eq!(
            facts["function_results"]["get_loyalty_points"]["data"]["points"],
            json!(12)
        );
        assert!(facts["user"].as_str().unwrap().contains("oat milk"));
        assert_eq!(facts["extra_context"], json!("store closes at 18:00"));
    }

    #[tokio::test]
    async fn test_grounded_reply_passes_facts_to_provider() {
        let service = service();
        let provider = MockProvider::new().with_response("You have 12 points.");
        let conversation = Conversation::new("system");
        let user = UserContext::new("u-1");

        let reply = service
            .grounded_reply(
                &provider,
                &conversation,
                "points?",
                &[executed("get_loyalty_points", json!({"points": 12}))],
                &user,
                None,
            )
            .await;
        assert_eq!(reply, "You have 12 points.");

        // The system instruction carried the facts.
        let sent = provider.recorded_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0].role, Role::System);
        assert!(sent[0][0].content.contains("get_loyalty_points"));
    }

    #[tokio::test]
    async fn test_grounded_reply_bounded_history() {
        let service = service();
        let provider = MockProvider::new().with_response("ok");
        let mut conversation = Conversation::new("system");
        for i in 0..20 {
            conversation.append(Message::user(format!("m{}", i)));
        }
        let user = UserContext::new("u-1");

        service
            .grounded_reply(&provider, &conversation, "hi", &[], &user, None)
            .await;

        let sent = provider.recorded_messages();
        // System instruction plus at most the window.
        assert_eq!(sent[0].len(), 1 + HISTORY_WINDOW);
        assert_eq!(sent[0][1].content, "m14");
    }

    #[tokio::test]
    async fn test_provider_failure_returns_apology() {
        let service = service();
        let provider =
            MockProvider::new().with_script(vec![MockResponse::Error("down".to_string())]);
        let conversation = Conversation::new("system");
        let user = UserContext::new("u-1");

        let reply = service
            .grounded_reply(&provider, &conversation, "hi", &[], &user, None)
            .await;
        assert_eq!(reply, GROUNDING_FALLBACK);
    }

    #[tokio::test]
    async fn test_empty_provider_reply_returns_apology() {
        let service = service();
        let provider = MockProvider::new().with_response("   ");
        let conversation = Conversation::new("system");
        let user = UserContext::new("u-1");

        let reply = service
            .grounded_reply(&provider, &conversation, "hi", &[], &user, None)
            .await;
        assert_eq!(reply, GROUNDING_FALLBACK);
    }
}
