// SPDX-License-Identifier: AGPL-3.0-or-later

//! Provider abstraction
//!
//! `AiProvider` is the single seam between the engine and any model backend.
//! Providers that cannot do structured function calling or streaming still
//! satisfy the trait through the degrade-path default methods, so callers can
//! always issue a `complete` or `send_message_stream` without checking
//! capabilities first.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::functions::FunctionParameters;
use crate::llm::message::{FunctionCall, Message};

/// Boxed stream of completion events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Trait for AI model providers
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name for logging and registry lookup
    fn name(&self) -> &str;

    /// Whether the backend supports structured function calling
    fn supports_function_calls(&self) -> bool {
        false
    }

    /// Send a conversation and get a plain text response
    async fn send_message(&self, messages: &[Message]) -> Result<String>;

    /// Send a conversation and stream the response incrementally.
    ///
    /// Backends without streaming fall back to a single chunk followed by
    /// `Done`.
    async fn send_message_stream(&self, messages: &[Message]) -> Result<EventStream> {
        let text = self.send_message(messages).await?;
        let stream = async_stream::stream! {
            yield Ok(StreamEvent::TextDelta(text));
            yield Ok(StreamEvent::Done);
        };
        Ok(Box::pin(stream))
    }

    /// Full completion call with function specs attached.
    ///
    /// Backends without function calling degrade to `send_message` and
    /// always return text content.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let text = self.send_message(&request.messages).await?;
        Ok(CompletionResponse {
            content: CompletionContent::Text(text),
        })
    }
}

/// A single request to `AiProvider::complete`
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Messages to send, system head first
    pub messages: Vec<Message>,
    /// Functions the model may call
    pub functions: Vec<FunctionSpec>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request for the given messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            functions: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Attach function specs the model may call
    pub fn with_functions(mut self, functions: Vec<FunctionSpec>) -> Self {
        self.functions = functions;
        self
    }

    /// Set the token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Response from `AiProvider::complete`
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// What the model produced
    pub content: CompletionContent,
}

/// A completion is either prose or a request to call a function
#[derive(Debug, Clone)]
pub enum CompletionContent {
    /// Plain text answer
    Text(String),
    /// The model wants a function executed
    FunctionCall(FunctionCall),
}

impl CompletionContent {
    /// Text content, if this is a text completion
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CompletionContent::Text(t) => Some(t),
            CompletionContent::FunctionCall(_) => None,
        }
    }
}

/// Incremental event from a streaming response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of response text
    TextDelta(String),
    /// Stream finished normally
    Done,
}

/// A function advertised to the model, serialized into provider requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Function name
    pub name: String,
    /// What the function does, for the model's benefit
    pub description: String,
    /// JSON schema of the parameters
    pub parameters: FunctionParameters,
}
