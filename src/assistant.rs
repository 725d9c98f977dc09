// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chat assistant
//!
//! The composed entry point for one chat session. It owns the conversation,
//! the function catalog, and one of two orchestration modes selected at
//! construction: the linear request pipeline, or the bounded tool-calling
//! loop driven by the model's own tool signals. Both modes share the same
//! conversation and catalog instances, and both guarantee a well-formed
//! response with non-empty content no matter what fails underneath.
//!
//! Callers are responsible for serializing requests per session;
//! `send_message` takes `&mut self` to make that contract explicit.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::functions::builtin::register_core_functions;
use crate::functions::FunctionCatalog;
use crate::grounding::GroundingService;
use crate::llm::http::{HttpProvider, HttpProviderConfig};
use crate::llm::message::{Conversation, Message};
use crate::llm::provider::AiProvider;
use crate::llm::registry::ProviderRegistry;
use crate::pipeline::tool_loop::ToolCallLoop;
use crate::pipeline::{MessageRequest, Pipeline};
use crate::profile::{BusinessProfile, UserContext};
use crate::services::static_data::{StaticActions, StaticCatalog, StaticSuggestions, StaticTemplates};
use crate::services::{
    ActionService, CatalogService, PromptTemplateService, SuggestionService, TEMPLATE_SYSTEM,
};
use crate::strategy::LlmStrategy;
use crate::ui::generator::UiGenerator;
use crate::ui::AiResponse;

/// How a session turns messages into responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationMode {
    /// Linear pipeline: detect, execute, ground, enrich
    Pipeline,
    /// Bounded loop driven by the model's own tool-call signals
    ToolLoop,
}

/// Builder for a chat session
pub struct ChatAssistantBuilder {
    registry: ProviderRegistry,
    provider_name: String,
    mode: OrchestrationMode,
    services: Arc<dyn CatalogService>,
    suggestions: Arc<dyn SuggestionService>,
    actions: Arc<dyn ActionService>,
    templates: Arc<dyn PromptTemplateService>,
    business: BusinessProfile,
    allow_list: Vec<String>,
    endpoints: Vec<(String, String)>,
}

impl ChatAssistantBuilder {
    fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            provider_name: "offline".to_string(),
            mode: OrchestrationMode::Pipeline,
            services: Arc::new(StaticCatalog::new()),
            suggestions: Arc::new(StaticSuggestions),
            actions: Arc::new(StaticActions),
            templates: Arc::new(StaticTemplates::new()),
            business: BusinessProfile::default(),
            allow_list: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// Use an explicitly built provider registry
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Pick the initial provider by name (offline fallback if unknown)
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    /// Pick the orchestration mode
    pub fn mode(mut self, mode: OrchestrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Swap in a catalog service implementation
    pub fn services(mut self, services: Arc<dyn CatalogService>) -> Self {
        self.services = services;
        self
    }

    /// Swap in a suggestion service implementation
    pub fn suggestions(mut self, suggestions: Arc<dyn SuggestionService>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Swap in an action service implementation
    pub fn actions(mut self, actions: Arc<dyn ActionService>) -> Self {
        self.actions = actions;
        self
    }

    /// Swap in a template service implementation
    pub fn templates(mut self, templates: Arc<dyn PromptTemplateService>) -> Self {
        self.templates = templates;
        self
    }

    /// Set the business profile used for the system prompt
    pub fn business(mut self, business: BusinessProfile) -> Self {
        self.business = business;
        self
    }

    /// Restrict callable functions to this list (empty allows all)
    pub fn allow_list(mut self, allow_list: Vec<String>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Route a function to a remote endpoint instead of its local handler
    pub fn endpoint(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints.push((name.into(), url.into()));
        self
    }

    /// Build the session
    pub fn build(self) -> ChatAssistant {
        let mut catalog = FunctionCatalog::with_allow_list(self.allow_list);
        register_core_functions(&mut catalog, self.services.clone());
        for (name, url) in self.endpoints {
            catalog.set_endpoint(name, url);
        }
        let catalog = Arc::new(catalog);

        // Rendered once at construction, not per message.
        let system_prompt = self
            .templates
            .prompt(
                TEMPLATE_SYSTEM,
                &json!({
                    "business_name": self.business.name,
                    "business_description": self.business.description,
                    "business_tone": self.business.tone,
                }),
            )
            .unwrap_or_else(|e| {
                tracing::error!(target: "cortado.session", error = %e, "system template failed");
                format!("You are the virtual assistant for {}.", self.business.name)
            });

        let provider = self.registry.get(&self.provider_name);
        let conversation = Arc::new(Mutex::new(Conversation::new(system_prompt)));
        let grounding = Arc::new(GroundingService::new(self.templates.clone()));
        let ui = Arc::new(UiGenerator::new(self.suggestions, self.actions));

        let mut assistant = ChatAssistant {
            registry: self.registry,
            provider,
            catalog: catalog.clone(),
            conversation,
            templates: self.templates,
            grounding,
            ui,
            mode: self.mode,
            pipeline: None,
            tool_loop: ToolCallLoop::new(catalog),
        };
        assistant.rebuild_pipeline();
        assistant
    }
}

/// One chat session over the orchestration engine
pub struct ChatAssistant {
    registry: ProviderRegistry,
    provider: Arc<dyn AiProvider>,
    catalog: Arc<FunctionCatalog>,
    conversation: Arc<Mutex<Conversation>>,
    templates: Arc<dyn PromptTemplateService>,
    grounding: Arc<GroundingService>,
    ui: Arc<UiGenerator>,
    mode: OrchestrationMode,
    pipeline: Option<Pipeline>,
    tool_loop: ToolCallLoop,
}

impl ChatAssistant {
    /// Start building a session
    pub fn builder() -> ChatAssistantBuilder {
        ChatAssistantBuilder::new()
    }

    /// A session with every default: offline provider, static services
    pub fn offline() -> Self {
        Self::builder().build()
    }

    fn rebuild_pipeline(&mut self) {
        let strategy = Arc::new(LlmStrategy::new(
            self.provider.clone(),
            self.catalog.clone(),
            self.templates.clone(),
        ));
        self.pipeline = Some(Pipeline::standard(
            self.conversation.clone(),
            strategy,
            self.provider.clone(),
            self.grounding.clone(),
            self.ui.clone(),
            self.catalog.clone(),
        ));
    }

    /// Handle one user message and always produce a response.
    pub async fn send_message(&mut self, text: &str, user: &UserContext) -> AiResponse {
        tracing::info!(
            target: "cortado.session",
            mode = ?self.mode,
            provider = self.provider.name(),
            "handling message"
        );

        let mut response = match self.mode {
            OrchestrationMode::Pipeline => {
                let request = MessageRequest::new(text, user.clone());
                match &self.pipeline {
                    Some(pipeline) => pipeline.run(request).await,
                    // rebuild_pipeline runs at construction; this is unreachable
                    // in practice but still degrades instead of panicking.
                    None => AiResponse::message_only(Message::assistant(
                        crate::grounding::GROUNDING_FALLBACK,
                    )),
                }
            }
            OrchestrationMode::ToolLoop => {
                let mut conversation = self.conversation.lock().await;
                let outcome = self
                    .tool_loop
                    .run(self.provider.as_ref(), &mut conversation, text)
                    .await;
                drop(conversation);

                let mut response = AiResponse::message_only(Message::assistant(outcome.reply));
                response.ui_components = self.ui.components(&outcome.executed, &self.catalog);
                response.suggested_prompts = self.ui.suggested_prompts(text, user).await;
                response.available_actions = self.ui.available_actions(text, user).await;
                response
            }
        };

        if response.message.content.trim().is_empty() {
            response.message.content = crate::grounding::GROUNDING_FALLBACK.to_string();
        }
        response
    }

    /// Conversation history excluding the system message
    pub async fn history(&self) -> Vec<Message> {
        self.conversation.lock().await.history().to_vec()
    }

    /// Clear the conversation back to only the system message
    pub async fn reset(&self) {
        self.conversation.lock().await.reset();
    }

    /// Switch the session to another provider.
    ///
    /// With a config, an HTTP provider is built and registered under `name`
    /// first. Unknown names without a config fall back to offline.
    pub fn change_provider(&mut self, name: &str, config: Option<HttpProviderConfig>) {
        if let Some(config) = config {
            self.registry
                .register_as(name, Arc::new(HttpProvider::new(config)));
        }
        self.provider = self.registry.get(name);
        tracing::info!(
            target: "cortado.session",
            provider = self.provider.name(),
            "provider changed"
        );
        self.rebuild_pipeline();
    }

    /// Name of the currently active provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The session's orchestration mode
    pub fn mode(&self) -> OrchestrationMode {
        self.mode
    }

    /// The shared function catalog
    pub fn catalog(&self) -> &FunctionCatalog {
        &self.catalog
    }

    /// Merge a remote function manifest into the catalog.
    ///
    /// The catalog is shared with the running pipeline through an `Arc`, so
    /// the merge clones it, loads, and swaps the handle.
    pub async fn load_remote_functions(&mut self, manifest_url: &str) -> Result<usize> {
        let mut catalog = FunctionCatalog::clone_registrations(&self.catalog);
        let added = catalog.load_remote(manifest_url).await?;
        self.catalog = Arc::new(catalog);
        self.tool_loop = ToolCallLoop::new(self.catalog.clone());
        self.rebuild_pipeline();
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Role;
    use crate::llm::mock_provider::{MockProvider, MockResponse};

    fn assistant_with(provider: MockProvider, mode: OrchestrationMode) -> ChatAssistant {
        let mut registry = ProviderRegistry::new();
        registry.register_as("scripted", Arc::new(provider));
        ChatAssistant::builder()
            .registry(registry)
            .provider("scripted")
            .mode(mode)
            .build()
    }

    #[tokio::test]
    async fn test_offline_session_always_answers() {
        let mut assistant = ChatAssistant::offline();
        let user = UserContext::new("u-1");

        let response = assistant.send_message("do you have oat milk?", &user).await;
        assert!(!response.message.content.trim().is_empty());
        assert_eq!(response.message.role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_fallback_when_everything_fails() {
        let provider = MockProvider::new().with_script(vec![MockResponse::Error(
            "total outage".to_string(),
        )]);
        let mut assistant = assistant_with(provider, OrchestrationMode::Pipeline);
        let user = UserContext::new("u-1");

        let response = assistant.send_message("hello?", &user).await;
        assert!(!response.message.content.trim().is_empty());
    }

    #[tokio::test]
    async fn test_history_and_reset() {
        let mut assistant = ChatAssistant::offline();
        let user = UserContext::new("u-1");

        assistant.send_message("first", &user).await;
        assistant.send_message("second", &user).await;

        let history = assistant.history().await;
        assert_eq!(history.len(), 4);
        assert!(history.iter().all(|m| m.role != Role::System));

        assistant.reset().await;
        assert!(assistant.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_change_provider_to_unknown_falls_back() {
        let mut assistant = ChatAssistant::offline();
        assistant.change_provider("nonexistent", None);
        assert_eq!(assistant.provider_name(), "offline");
    }

    #[tokio::test]
    async fn test_change_provider_with_config_registers_http() {
        let mut assistant = ChatAssistant::offline();
        assistant.change_provider(
            "backend",
            Some(HttpProviderConfig {
                base_url: "http://localhost:9999/v1/chat/completions".to_string(),
                api_key: None,
                model: "test".to_string(),
            }),
        );
        assert_eq!(assistant.provider_name(), "http");
    }

    #[tokio::test]
    async fn test_tool_loop_mode_attaches_ui() {
        let provider = MockProvider::new().with_script(vec![
            MockResponse::FunctionCall {
                name: "get_loyalty_points".to_string(),
                arguments: r#"{"userId": "u-1"}"#.to_string(),
            },
            MockResponse::Text("You have 0 points.".to_string()),
        ]);
        let mut assistant = assistant_with(provider, OrchestrationMode::ToolLoop);
        let user = UserContext::new("u-1");

        let response = assistant.send_message("points?", &user).await;
        assert_eq!(response.message.content, "You have 0 points.");
        assert_eq!(response.ui_components.len(), 1);
        assert!(!response.suggested_prompts.is_empty());
    }

    #[tokio::test]
    async fn test_system_message_invariant_across_modes() {
        for mode in [OrchestrationMode::Pipeline, OrchestrationMode::ToolLoop] {
            let mut assistant = assistant_with(
                MockProvider::new().with_response("ok"),
                mode,
            );
            let user = UserContext::new("u-1");

            assistant.send_message("one", &user).await;
            assistant.reset().await;
            assistant.send_message("two", &user).await;

            let conversation = assistant.conversation.lock().await;
            let system_positions: Vec<usize> = conversation
                .all_messages()
                .iter()
                .enumerate()
                .filter(|(_, m)| m.role == Role::System)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(system_positions, vec![0]);
        }
    }
}
