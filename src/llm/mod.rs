// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model provider abstraction and implementations

pub mod http;
pub mod message;
pub mod mock_provider;
pub mod offline;
pub mod provider;
pub mod registry;

pub use message::{Conversation, FunctionCall, FunctionResult, Message, Role};
pub use provider::{
    AiProvider, CompletionContent, CompletionRequest, CompletionResponse, FunctionSpec,
    StreamEvent,
};
pub use registry::ProviderRegistry;
