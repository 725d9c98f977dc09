// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded tool-calling loop
//!
//! The second orchestration mode: instead of pre-detecting functions, let the
//! model itself signal tool calls turn by turn. Each function-call completion
//! appends the call and its result to the shared conversation and loops; a
//! plain answer terminates. The loop issues at most `MAX_FUNCTION_CALLS`
//! completions per user message, which doubles as the liveness bound.

use std::sync::Arc;

use serde_json::Value;

use crate::functions::FunctionCatalog;
use crate::llm::message::{Conversation, Message};
use crate::llm::provider::{AiProvider, CompletionContent, CompletionRequest};
use crate::orchestrator::ExecutedFunction;

/// Maximum provider completions per user message
pub const MAX_FUNCTION_CALLS: usize = 5;

/// Fallback when the call budget is exhausted without a plain answer
pub const LOOP_FALLBACK: &str =
    "I'm having trouble processing this — could you give more detail?";

/// What one loop run produced
#[derive(Debug)]
pub struct LoopOutcome {
    /// Final assistant text, already appended to the conversation
    pub reply: String,
    /// Every function the loop executed, in order
    pub executed: Vec<ExecutedFunction>,
}

/// Multi-turn tool-calling orchestrator
pub struct ToolCallLoop {
    catalog: Arc<FunctionCatalog>,
}

impl ToolCallLoop {
    /// Create a loop over the shared function catalog
    pub fn new(catalog: Arc<FunctionCatalog>) -> Self {
        Self { catalog }
    }

    /// Run the loop for one user message.
    ///
    /// The user turn is appended to the conversation first; whatever text
    /// this returns has already been appended as the assistant turn. Never
    /// fails: provider errors and budget exhaustion both produce fallback
    /// text.
    pub async fn run(
        &self,
        provider: &dyn AiProvider,
        conversation: &mut Conversation,
        text: &str,
    ) -> LoopOutcome {
        conversation.append(Message::user(text));

        let functions = self.catalog.list_for_model();
        let mut executed = Vec::new();

        for turn in 0..MAX_FUNCTION_CALLS {
            let request = CompletionRequest::new(conversation.all_messages().to_vec())
                .with_functions(functions.clone());

            let response = match provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        target: "cortado.loop",
                        error = %e,
                        turn,
                        "provider failed, terminating loop"
                    );
                    let fallback = crate::grounding::GROUNDING_FALLBACK.to_string();
                    conversation.append(Message::assistant(fallback.clone()));
                    return LoopOutcome {
                        reply: fallback,
                        executed,
                    };
                }
            };

            match response.content {
                CompletionContent::Text(reply) => {
                    tracing::debug!(target: "cortado.loop", turn, "model answered in text");
                    conversation.append(Message::assistant(reply.clone()));
                    return LoopOutcome { reply, executed };
                }
                CompletionContent::FunctionCall(call) => {
                    tracing::debug!(
                        target: "cortado.loop",
                        turn,
                        function = %call.name,
                        "model requested a function call"
                    );

                    // Malformed argument JSON degrades to an empty object;
                    // the handler's own validation produces the failure.
                    let args: Value = serde_json::from_str(&call.arguments)
                        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

                    conversation.append(Message::function_call(call.clone()));
                    let result = self.catalog.execute(&call.name, args).await;
                    conversation
                        .append(Message::function_result(&call.name, result.to_value()));
                    executed.push(ExecutedFunction {
                        function_name: call.name,
                        result,
                    });
                }
            }
        }

        tracing::warn!(
            target: "cortado.loop",
            max_calls = MAX_FUNCTION_CALLS,
            "call budget exhausted without a plain answer"
        );
        conversation.append(Message::assistant(LOOP_FALLBACK));
        LoopOutcome {
            reply: LOOP_FALLBACK.to_string(),
            executed,
        }
    }
}
