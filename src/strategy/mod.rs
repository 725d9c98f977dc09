// SPDX-License-Identifier: AGPL-3.0-or-later

//! Function execution strategies
//!
//! A strategy decides which functions a user message should trigger and what
//! arguments they receive. `DirectStrategy` executes whatever the caller
//! already decided. `LlmStrategy` asks the model to select functions and
//! extract parameters, with literal-substring and type-default fallbacks so
//! a confused model degrades to "no functions" instead of an error.

pub mod json_extract;

use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::functions::builtin::{FN_ITEM_DETAILS, FN_SEARCH_MENU};
use crate::functions::{FunctionCallResult, FunctionCatalog, FunctionDefinition};
use crate::llm::message::Message;
use crate::llm::provider::AiProvider;
use crate::profile::UserContext;
use crate::services::{
    DayPart, PromptTemplateService, TEMPLATE_FUNCTION_SELECTION, TEMPLATE_PARAM_EXTRACTION,
};

/// Sentinel identifier used when entity resolution finds nothing
pub const UNRESOLVED_ID: &str = "unresolved";

/// Pluggable seam between detection and execution
#[async_trait]
pub trait FunctionExecutionStrategy: Send + Sync {
    /// Execute the named function with the given arguments
    async fn execute_function(&self, name: &str, args: Value) -> FunctionCallResult;

    /// Which functions the message should trigger. The base strategy selects
    /// nothing; callers decide for themselves.
    async fn determine_functions(&self, _message: &str, _user: &UserContext) -> Vec<String> {
        Vec::new()
    }

    /// Build arguments for one selected function
    async fn build_params_for_function(
        &self,
        _name: &str,
        _message: &str,
        _user: &UserContext,
    ) -> Value {
        Value::Object(Map::new())
    }
}

/// Executes pre-decided calls with no selection logic
pub struct DirectStrategy {
    catalog: Arc<FunctionCatalog>,
}

impl DirectStrategy {
    /// Create a direct strategy over the given catalog
    pub fn new(catalog: Arc<FunctionCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl FunctionExecutionStrategy for DirectStrategy {
    async fn execute_function(&self, name: &str, args: Value) -> FunctionCallResult {
        self.catalog.execute(name, args).await
    }
}

/// LLM-guided selection and parameter extraction
pub struct LlmStrategy {
    provider: Arc<dyn AiProvider>,
    catalog: Arc<FunctionCatalog>,
    templates: Arc<dyn PromptTemplateService>,
}

impl LlmStrategy {
    /// Create an LLM-guided strategy
    pub fn new(
        provider: Arc<dyn AiProvider>,
        catalog: Arc<FunctionCatalog>,
        templates: Arc<dyn PromptTemplateService>,
    ) -> Self {
        Self {
            provider,
            catalog,
            templates,
        }
    }

    fn function_listing(&self) -> String {
        self.catalog
            .list_for_model()
            .iter()
            .map(|spec| format!("- {}: {}", spec.name, spec.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the selection reply. A parsed JSON array is authoritative, even
    /// when empty: `[]` means the model declined every function, and any prose
    /// around it must not re-select one. The literal substring scan only runs
    /// when no array can be extracted at all.
    fn parse_selection(&self, reply: &str) -> Vec<String> {
        let known = self.catalog.names();

        if let Some(Value::Array(items)) = json_extract::extract_array(reply) {
            return items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .filter(|name| known.iter().any(|k| k == name))
                .collect();
        }

        tracing::debug!(
            target: "cortado.strategy",
            "selection reply had no JSON array, scanning for names"
        );
        known
            .into_iter()
            .filter(|name| reply.contains(name.as_str()))
            .collect()
    }

    /// Fill missing required parameters with type-appropriate defaults.
    fn apply_defaults(definition: &FunctionDefinition, user: &UserContext, args: &mut Map<String, Value>) {
        // The user's id is always derivable from the session, not the text.
        if definition.parameters.property("userId").is_some() && !args.contains_key("userId") {
            args.insert("userId".to_string(), json!(user.user_id));
        }

        for name in &definition.parameters.required {
            if args.contains_key(name) {
                continue;
            }
            let property = definition.parameters.property(name);
            args.insert(name.clone(), Self::default_for(name, property));
        }
    }

    fn default_for(name: &str, property: Option<&Value>) -> Value {
        if name == "timeOfDay" {
            return json!(DayPart::current().to_string());
        }
        if name == "category" || name == "type" {
            let has_all = property
                .and_then(|p| p.get("enum"))
                .and_then(Value::as_array)
                .map(|values| values.iter().any(|v| v == "all"))
                .unwrap_or(false);
            if has_all {
                return json!("all");
            }
        }

        let schema_type = property
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("string");
        match schema_type {
            "integer" | "number" => json!(0),
            "boolean" => json!(false),
            "array" => json!([]),
            "object" => json!({}),
            _ => json!(""),
        }
    }

    /// Whether a string looks like a stable identifier rather than a name.
    ///
    /// Requires at least one hyphenated segment: `coffee-2` is an id,
    /// `cappuccino` and `iced latte` are names.
    fn is_identifier_shaped(value: &str) -> bool {
        static ID_RE: OnceLock<Regex> = OnceLock::new();
        let re = ID_RE.get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9]+(-[A-Za-z0-9]+)+$").expect("identifier regex is valid")
        });
        re.is_match(value)
    }

    /// Resolve a human name in `itemId` to a real identifier via search.
    async fn resolve_item_id(&self, args: &mut Map<String, Value>) {
        let Some(raw) = args.get("itemId").and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        if raw.is_empty() || Self::is_identifier_shaped(&raw) {
            return;
        }

        tracing::debug!(
            target: "cortado.strategy",
            item = %raw,
            "itemId is name-shaped, resolving via search"
        );

        let search = self
            .catalog
            .execute(FN_SEARCH_MENU, json!({"query": raw}))
            .await;

        let resolved = search
            .data
            .as_ref()
            .and_then(|d| d.get("results"))
            .and_then(Value::as_array)
            .map(|results| {
                if results.len() > 1 {
                    tracing::warn!(
                        target: "cortado.strategy",
                        query = %raw,
                        matches = results.len(),
                        "ambiguous name resolution, using first match"
                    );
                }
                results
                    .first()
                    .and_then(|hit| hit.get("id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(None);

        match resolved {
            Some(id) => {
                args.insert("itemId".to_string(), json!(id));
            }
            None => {
                tracing::warn!(
                    target: "cortado.strategy",
                    query = %raw,
                    "name resolution found nothing, marking unresolved"
                );
                args.insert("itemId".to_string(), json!(UNRESOLVED_ID));
            }
        }
    }
}

#[async_trait]
impl FunctionExecutionStrategy for LlmStrategy {
    async fn execute_function(&self, name: &str, args: Value) -> FunctionCallResult {
        self.catalog.execute(name, args).await
    }

    async fn determine_functions(&self, message: &str, user: &UserContext) -> Vec<String> {
        let prompt = match self.templates.prompt(
            TEMPLATE_FUNCTION_SELECTION,
            &json!({
                "functions": self.function_listing(),
                "message": message,
                "user_context": user.as_prompt_block(),
            }),
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(target: "cortado.strategy", error = %e, "selection template failed");
                return Vec::new();
            }
        };

        let reply = match self.provider.send_message(&[Message::user(prompt)]).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    target: "cortado.strategy",
                    error = %e,
                    "provider failed during selection, selecting nothing"
                );
                return Vec::new();
            }
        };

        let selected = self.parse_selection(&reply);
        tracing::debug!(target: "cortado.strategy", ?selected, "functions selected");
        selected
    }

    async fn build_params_for_function(
        &self,
        name: &str,
        message: &str,
        user: &UserContext,
    ) -> Value {
        let Some(definition) = self.catalog.get(name) else {
            return Value::Object(Map::new());
        };

        let mut args = Map::new();

        let prompt = self.templates.prompt(
            TEMPLATE_PARAM_EXTRACTION,
            &json!({
                "function_name": name,
                "parameters": definition.parameters,
                "message": message,
                "user_context": user.as_prompt_block(),
            }),
        );

        if let Ok(prompt) = prompt {
            match self.provider.send_message(&[Message::user(prompt)]).await {
                Ok(reply) => {
                    if let Some(Value::Object(extracted)) = json_extract::extract_object(&reply) {
                        // Keep only declared parameters; models invent extras.
                        for (key, value) in extracted {
                            if definition.parameters.property(&key).is_some() {
                                args.insert(key, value);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        target: "cortado.strategy",
                        function = %name,
                        error = %e,
                        "provider failed during extraction, using defaults"
                    );
                }
            }
        }

        Self::apply_defaults(&definition, user, &mut args);

        if name == FN_ITEM_DETAILS {
            self.resolve_item_id(&mut args).await;
        }

        Value::Object(args)
    }
}
