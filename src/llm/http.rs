// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP model provider
//!
//! Speaks an OpenAI-style chat-completions JSON shape, the de-facto format
//! most hosted and self-hosted backends accept. Function specs are sent as
//! `tools`; a tool call comes back as a single named call with a JSON-string
//! argument payload, which is exactly the shape the engine's
//! `CompletionContent::FunctionCall` expects.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::llm::message::{FunctionCall, Message, Role};
use crate::llm::provider::{
    AiProvider, CompletionContent, CompletionRequest, CompletionResponse, FunctionSpec,
};

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Configuration for the HTTP provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProviderConfig {
    /// Chat-completions endpoint URL
    pub base_url: String,
    /// Bearer token, if the backend requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier to request
    pub model: String,
}

/// Provider backed by an OpenAI-compatible chat-completions endpoint
pub struct HttpProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpProvider {
    /// Create a provider from its configuration
    pub fn new(config: HttpProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                    // Function results travel as tool-role messages.
                    Role::Function => "tool",
                };
                WireMessage {
                    role: role.to_string(),
                    content: m.content.clone(),
                    name: m.name.clone(),
                    tool_calls: m.function_call.as_ref().map(|call| {
                        vec![WireToolCall {
                            id: format!("call_{}", m.id.simple()),
                            call_type: "function".to_string(),
                            function: WireFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        }]
                    }),
                }
            })
            .collect()
    }

    fn convert_functions(functions: &[FunctionSpec]) -> Vec<Value> {
        functions
            .iter()
            .filter_map(|f| {
                serde_json::to_value(f)
                    .ok()
                    .map(|spec| serde_json::json!({"type": "function", "function": spec}))
            })
            .collect()
    }

    async fn post(&self, body: &WireRequest) -> Result<WireResponse> {
        let mut request = self.client.post(&self.config.base_url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthenticationFailed.into());
        }
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited(retry_after).into());
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()).into())
    }

    fn extract_content(response: WireResponse) -> Result<CompletionContent> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))?;

        if let Some(tool_calls) = choice.message.tool_calls {
            if let Some(call) = tool_calls.into_iter().next() {
                return Ok(CompletionContent::FunctionCall(FunctionCall {
                    name: call.function.name,
                    arguments: call.function.arguments,
                }));
            }
        }

        match choice.message.content {
            Some(text) => Ok(CompletionContent::Text(text)),
            None => Err(ProviderError::InvalidResponse(
                "choice had neither content nor tool calls".to_string(),
            )
            .into()),
        }
    }
}

#[async_trait]
impl AiProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn supports_function_calls(&self) -> bool {
        true
    }

    async fn send_message(&self, messages: &[Message]) -> Result<String> {
        let body = WireRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            tools: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        };

        let response = self.post(&body).await?;
        match Self::extract_content(response)? {
            CompletionContent::Text(text) => Ok(text),
            // No tools were offered, so a tool call here is a protocol breach.
            CompletionContent::FunctionCall(call) => Err(ProviderError::InvalidResponse(
                format!("unexpected tool call to {}", call.name),
            )
            .into()),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let tools = if request.functions.is_empty() {
            None
        } else {
            Some(Self::convert_functions(&request.functions))
        };

        let body = WireRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(&request.messages),
            tools,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        };

        let response = self.post(&body).await?;
        Ok(CompletionResponse {
            content: Self::extract_content(response)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}
