// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cortado - conversational function-orchestration engine for a retail/café
//! chat assistant.
//!
//! This crate exposes the runtime behind the chat front end:
//! - `functions`: catalog of callable functions with JSON-schema parameters
//! - `strategy`: LLM-guided (or direct) selection and argument building
//! - `llm`: provider abstraction, registry, and implementations
//! - `pipeline`: the linear request pipeline and the bounded tool-call loop
//! - `grounding`: fact-constrained final replies
//! - `ui`: response descriptors and suggestion/action enrichment
//! - `assistant`: the composed per-session entry point
//!
//! Rendering, browser storage, and concrete analytics providers are out of
//! scope; the engine consumes them behind the traits in `services`.

pub mod assistant;
pub mod config;
pub mod error;
pub mod functions;
pub mod grounding;
pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod profile;
pub mod services;
pub mod strategy;
pub mod ui;

pub use assistant::{ChatAssistant, OrchestrationMode};
pub use error::{CortadoError, Result};
pub use profile::{BusinessProfile, UserContext};
pub use ui::AiResponse;
