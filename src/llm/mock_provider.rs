// SPDX-License-Identifier: AGPL-3.0-or-later

//! Mock provider for testing
//!
//! A configurable scripted implementation of the `AiProvider` trait so tests
//! can drive the orchestration engine without real API calls. Responses are
//! consumed in order; once exhausted, the last one repeats.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::error::{ProviderError, Result};
use crate::llm::message::{FunctionCall, Message};
use crate::llm::provider::{
    AiProvider, CompletionContent, CompletionRequest, CompletionResponse, EventStream,
    StreamEvent,
};

/// A scripted response for the mock provider
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// A plain text answer
    Text(String),
    /// A function call the model wants executed
    FunctionCall { name: String, arguments: String },
    /// A simulated provider failure
    Error(String),
}

/// A mock provider for testing
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    responses: Arc<Mutex<Vec<MockResponse>>>,
    call_count: Arc<AtomicUsize>,
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    recorded_messages: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a mock provider with a single default response
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: Arc::new(Mutex::new(vec![MockResponse::Text(
                "Mock response".to_string(),
            )])),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(Vec::new())),
            recorded_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.name = name.into();
        provider
    }

    /// Replace the script with a single text response
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.set_responses(vec![MockResponse::Text(text.into())]);
        self
    }

    /// Replace the script with multiple text responses, returned in order
    pub fn with_responses(self, texts: Vec<String>) -> Self {
        self.set_responses(texts.into_iter().map(MockResponse::Text).collect());
        self
    }

    /// Replace the script with arbitrary scripted responses
    pub fn with_script(self, script: Vec<MockResponse>) -> Self {
        self.set_responses(script);
        self
    }

    /// Replace the script with a single function-call response
    pub fn with_function_call(self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        self.set_responses(vec![MockResponse::FunctionCall {
            name: name.into(),
            arguments: arguments.to_string(),
        }]);
        self
    }

    fn set_responses(&self, responses: Vec<MockResponse>) {
        let mut guard = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("mock provider responses lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = responses;
    }

    /// Number of times any capability method was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// All recorded `complete` requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }

    /// All message vectors handed to `send_message`
    pub fn recorded_messages(&self) -> Vec<Vec<Message>> {
        self.recorded_messages.lock().unwrap().clone()
    }

    /// Reset counters and recordings, keeping the script
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        self.recorded_requests.lock().unwrap().clear();
        self.recorded_messages.lock().unwrap().clear();
    }

    fn next_response(&self) -> MockResponse {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            MockResponse::Text("Mock response".to_string())
        } else {
            responses[count.min(responses.len() - 1)].clone()
        }
    }

    fn text_or_error(&self, response: MockResponse) -> Result<String> {
        match response {
            MockResponse::Text(text) => Ok(text),
            // Plain messaging has no structured channel; render the call as text.
            MockResponse::FunctionCall { name, arguments } => {
                Ok(format!("{}({})", name, arguments))
            }
            MockResponse::Error(message) => Err(ProviderError::Network(message).into()),
        }
    }
}

#[async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_function_calls(&self) -> bool {
        true
    }

    async fn send_message(&self, messages: &[Message]) -> Result<String> {
        self.recorded_messages.lock().unwrap().push(messages.to_vec());
        self.text_or_error(self.next_response())
    }

    async fn send_message_stream(&self, messages: &[Message]) -> Result<EventStream> {
        self.recorded_messages.lock().unwrap().push(messages.to_vec());
        let text = self.text_or_error(self.next_response())?;

        // Chunked by characters to exercise real incremental consumption.
        let mut events: Vec<Result<StreamEvent>> = text
            .chars()
            .collect::<Vec<_>>()
            .chunks(8)
            .map(|chunk| Ok(StreamEvent::TextDelta(chunk.iter().collect())))
            .collect();
        events.push(Ok(StreamEvent::Done));

        Ok(Box::pin(stream::iter(events)))
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.recorded_requests.lock().unwrap().push(request);

        let content = match self.next_response() {
            MockResponse::Text(text) => CompletionContent::Text(text),
            MockResponse::FunctionCall { name, arguments } => {
                CompletionContent::FunctionCall(FunctionCall { name, arguments })
            }
            MockResponse::Error(message) => {
                return Err(ProviderError::Network(message).into());
            }
        };

        Ok(CompletionResponse { content })
    }
}
