// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request pipeline
//!
//! One user message flows through an ordered, immutable list of stages that
//! fold over a `MessageRequest` accumulator: user message intake, function
//! detection, execution, grounding, UI enrichment. A stage may short-circuit
//! with a terminal response; otherwise every stage runs, and an empty result
//! from one stage is valid input to the next.

pub mod tool_loop;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::functions::FunctionCatalog;
use crate::grounding::GroundingService;
use crate::llm::message::{Conversation, Message};
use crate::llm::provider::AiProvider;
use crate::orchestrator::{self, DetectedCall, ExecutedFunction};
use crate::profile::UserContext;
use crate::strategy::FunctionExecutionStrategy;
use crate::ui::generator::UiGenerator;
use crate::ui::{AiResponse, AvailableAction, UiComponent};

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestState {
    /// Request constructed
    Received,
    /// Candidate functions known, possibly none
    Detected,
    /// Function results known, possibly none
    Executed,
    /// Final assistant message known
    Grounded,
    /// UI artifacts attached
    Enriched,
}

/// Per-request accumulator passed through the stage list.
///
/// Created once per inbound message, never shared across requests, dropped
/// when the pipeline returns.
pub struct MessageRequest {
    /// The user's message text
    pub text: String,
    /// Read-only profile of the requesting user
    pub user: UserContext,
    /// Lifecycle state, advanced by each stage
    pub state: RequestState,
    /// Calls selected by detection
    pub detected: Vec<DetectedCall>,
    /// Results collected by execution
    pub executed: Vec<ExecutedFunction>,
    /// Final assistant text produced by grounding
    pub grounded_reply: Option<String>,
    /// Components attached by UI generation
    pub ui_components: Vec<UiComponent>,
    /// Suggested prompts attached by UI generation
    pub suggested_prompts: Vec<String>,
    /// Actions attached by UI generation
    pub available_actions: Vec<AvailableAction>,
}

impl MessageRequest {
    /// Create a request in the `Received` state
    pub fn new(text: impl Into<String>, user: UserContext) -> Self {
        Self {
            text: text.into(),
            user,
            state: RequestState::Received,
            detected: Vec::new(),
            executed: Vec::new(),
            grounded_reply: None,
            ui_components: Vec::new(),
            suggested_prompts: Vec::new(),
            available_actions: Vec::new(),
        }
    }
}

/// What a stage tells the fold to do next
pub enum StageOutcome {
    /// Proceed to the next stage
    Continue,
    /// Stop here with a terminal response
    ShortCircuit(AiResponse),
}

/// One unit of the request pipeline
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Stage name for logging
    fn name(&self) -> &str;

    /// Process the request, mutating the accumulator
    async fn run(&self, request: &mut MessageRequest) -> StageOutcome;
}

/// The ordered stage list
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    /// Build a pipeline from an explicit stage list
    pub fn new(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        Self { stages }
    }

    /// The standard five-stage pipeline
    pub fn standard(
        conversation: Arc<Mutex<Conversation>>,
        strategy: Arc<dyn FunctionExecutionStrategy>,
        provider: Arc<dyn AiProvider>,
        grounding: Arc<GroundingService>,
        ui: Arc<UiGenerator>,
        catalog: Arc<FunctionCatalog>,
    ) -> Self {
        Self::new(vec![
            Box::new(UserMessageStage {
                conversation: conversation.clone(),
            }),
            Box::new(FunctionDetectionStage {
                strategy: strategy.clone(),
            }),
            Box::new(FunctionExecutionStage { strategy }),
            Box::new(GroundingStage {
                conversation,
                provider,
                grounding,
            }),
            Box::new(UiGenerationStage { ui, catalog }),
        ])
    }

    /// Fold the request through every stage and assemble the response
    pub async fn run(&self, mut request: MessageRequest) -> AiResponse {
        for stage in &self.stages {
            tracing::debug!(
                target: "cortado.pipeline",
                stage = stage.name(),
                state = ?request.state,
                "running stage"
            );
            if let StageOutcome::ShortCircuit(response) = stage.run(&mut request).await {
                tracing::debug!(
                    target: "cortado.pipeline",
                    stage = stage.name(),
                    "stage short-circuited"
                );
                return response;
            }
        }

        let content = request
            .grounded_reply
            .unwrap_or_else(|| crate::grounding::GROUNDING_FALLBACK.to_string());

        AiResponse {
            message: Message::assistant(content),
            ui_components: request.ui_components,
            suggested_prompts: request.suggested_prompts,
            available_actions: request.available_actions,
        }
    }
}

/// Validates input and records the user turn
pub struct UserMessageStage {
    conversation: Arc<Mutex<Conversation>>,
}

#[async_trait]
impl PipelineStage for UserMessageStage {
    fn name(&self) -> &str {
        "user_message"
    }

    async fn run(&self, request: &mut MessageRequest) -> StageOutcome {
        if request.text.trim().is_empty() {
            return StageOutcome::ShortCircuit(AiResponse::message_only(Message::assistant(
                "I didn't catch that. What can I help you with?",
            )));
        }
        self.conversation
            .lock()
            .await
            .append(Message::user(request.text.clone()));
        StageOutcome::Continue
    }
}

/// Selects candidate functions and builds their arguments
pub struct FunctionDetectionStage {
    strategy: Arc<dyn FunctionExecutionStrategy>,
}

#[async_trait]
impl PipelineStage for FunctionDetectionStage {
    fn name(&self) -> &str {
        "function_detection"
    }

    async fn run(&self, request: &mut MessageRequest) -> StageOutcome {
        let names = self
            .strategy
            .determine_functions(&request.text, &request.user)
            .await;

        for name in names {
            let args = self
                .strategy
                .build_params_for_function(&name, &request.text, &request.user)
                .await;
            request.detected.push(DetectedCall {
                function_name: name,
                args,
            });
        }

        request.state = RequestState::Detected;
        StageOutcome::Continue
    }
}

/// Executes detected calls concurrently
pub struct FunctionExecutionStage {
    strategy: Arc<dyn FunctionExecutionStrategy>,
}

#[async_trait]
impl PipelineStage for FunctionExecutionStage {
    fn name(&self) -> &str {
        "function_execution"
    }

    async fn run(&self, request: &mut MessageRequest) -> StageOutcome {
        let calls = std::mem::take(&mut request.detected);
        request.executed = orchestrator::execute_all(self.strategy.as_ref(), calls).await;
        request.state = RequestState::Executed;
        StageOutcome::Continue
    }
}

/// Produces the final fact-constrained reply
pub struct GroundingStage {
    conversation: Arc<Mutex<Conversation>>,
    provider: Arc<dyn AiProvider>,
    grounding: Arc<GroundingService>,
}

#[async_trait]
impl PipelineStage for GroundingStage {
    fn name(&self) -> &str {
        "grounding"
    }

    async fn run(&self, request: &mut MessageRequest) -> StageOutcome {
        let conversation = self.conversation.lock().await;
        let reply = self
            .grounding
            .grounded_reply(
                self.provider.as_ref(),
                &conversation,
                &request.text,
                &request.executed,
                &request.user,
                orchestrator::combined_interim_reply(&request.executed).as_deref(),
            )
            .await;
        drop(conversation);

        self.conversation
            .lock()
            .await
            .append(Message::assistant(reply.clone()));
        request.grounded_reply = Some(reply);
        request.state = RequestState::Grounded;
        StageOutcome::Continue
    }
}

/// Attaches components, prompts, and actions
pub struct UiGenerationStage {
    ui: Arc<UiGenerator>,
    catalog: Arc<FunctionCatalog>,
}

#[async_trait]
impl PipelineStage for UiGenerationStage {
    fn name(&self) -> &str {
        "ui_generation"
    }

    async fn run(&self, request: &mut MessageRequest) -> StageOutcome {
        request.ui_components = self.ui.components(&request.executed, &self.catalog);
        request.suggested_prompts = self.ui.suggested_prompts(&request.text, &request.user).await;
        request.available_actions = self.ui.available_actions(&request.text, &request.user).await;
        request.state = RequestState::Enriched;
        StageOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::builtin::register_core_functions;
    use crate::functions::FunctionCatalog;
    use crate::llm::mock_provider::MockProvider;
    use crate::services::static_data::{StaticActions, StaticCatalog, StaticSuggestions, StaticTemplates};
    use crate::strategy::LlmStrategy;

    fn standard_pipeline(provider: MockProvider) -> (Pipeline, Arc<Mutex<Conversation>>) {
        let services = Arc::new(StaticCatalog::new());
        services.set_loyalty_points("u-1", 120);
        let mut catalog = FunctionCatalog::new();
        register_core_functions(&mut catalog, services);
        let catalog = Arc::new(catalog);
        let templates = Arc::new(StaticTemplates::new());
        let provider: Arc<dyn AiProvider> = Arc::new(provider);
        let conversation = Arc::new(Mutex::new(Conversation::new("system prompt")));

        let pipeline = Pipeline::standard(
            conversation.clone(),
            Arc::new(LlmStrategy::new(
                provider.clone(),
                catalog.clone(),
                templates.clone(),
            )),
            provider,
            Arc::new(GroundingService::new(templates)),
            Arc::new(UiGenerator::new(
                Arc::new(StaticSuggestions),
                Arc::new(StaticActions),
            )),
            catalog,
        );
        (pipeline, conversation)
    }

    #[tokio::test]
    async fn test_full_pipeline_with_function() {
        // Selection, extraction, grounding: three scripted provider turns.
        let provider = MockProvider::new().with_responses(vec![
            r#"["get_loyalty_points"]"#.to_string(),
            r#"{"userId": "u-1"}"#.to_string(),
            "You have 120 loyalty points.".to_string(),
        ]);
        let (pipeline, conversation) = standard_pipeline(provider);

        let response = pipeline
            .run(MessageRequest::new("how many points do I have?", UserContext::new("u-1")))
            .await;

        assert_eq!(response.message.content, "You have 120 loyalty points.");
        assert_eq!(response.ui_components.len(), 1);
        assert!(!response.suggested_prompts.is_empty());
        assert!(!response.available_actions.is_empty());

        let conversation = conversation.lock().await;
        assert_eq!(conversation.history().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_detection_still_grounds() {
        let provider = MockProvider::new().with_responses(vec![
            "[]".to_string(),
            "Happy to help! What would you like?".to_string(),
        ]);
        let (pipeline, _) = standard_pipeline(provider);

        let response = pipeline
            .run(MessageRequest::new("hello there", UserContext::new("u-1")))
            .await;

        assert_eq!(response.message.content, "Happy to help! What would you like?");
        assert!(response.ui_components.is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_short_circuits() {
        let provider = MockProvider::new();
        let (pipeline, conversation) = standard_pipeline(provider);

        let response = pipeline
            .run(MessageRequest::new("   ", UserContext::new("u-1")))
            .await;

        assert!(!response.message.content.is_empty());
        // Nothing was recorded for a blank turn.
        assert!(conversation.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_state_advances_through_stages() {
        let strategy: Arc<dyn FunctionExecutionStrategy> = {
            let services = Arc::new(StaticCatalog::new());
            let mut catalog = FunctionCatalog::new();
            register_core_functions(&mut catalog, services);
            Arc::new(crate::strategy::DirectStrategy::new(Arc::new(catalog)))
        };

        let mut request = MessageRequest::new("hi", UserContext::new("u-1"));
        assert_eq!(request.state, RequestState::Received);

        let detection = FunctionDetectionStage {
            strategy: strategy.clone(),
        };
        detection.run(&mut request).await;
        assert_eq!(request.state, RequestState::Detected);
        assert!(request.detected.is_empty());

        let execution = FunctionExecutionStage { strategy };
        execution.run(&mut request).await;
        assert_eq!(request.state, RequestState::Executed);
        assert!(request.executed.is_empty());
    }
}
