// SPDX-License-Identifier: AGPL-3.0-or-later

//! Function catalog
//!
//! The catalog holds every function the assistant can invoke, keyed by name.
//! Each function carries a JSON schema for its parameters, an optional local
//! handler, and an optional UI hint. Execution never returns `Err`: every
//! outcome, including "no such function", is folded into a
//! `FunctionCallResult` so one bad call cannot take down a request.
//!
//! Remote endpoints configured per function take precedence over local
//! handlers; if the endpoint call fails for any reason the local handler is
//! tried as a fallback.

pub mod builtin;
pub mod schema;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::llm::provider::FunctionSpec;
use crate::ui::UiComponentKind;

/// JSON schema describing a function's parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParameters {
    /// Always "object" for function parameters
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions keyed by parameter name
    pub properties: Value,

    /// Names of required parameters
    #[serde(default)]
    pub required: Vec<String>,
}

impl FunctionParameters {
    /// An empty object schema for functions that take no parameters
    pub fn empty() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(serde_json::Map::new()),
            required: Vec::new(),
        }
    }

    /// Property definition for the named parameter, if declared
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Names of all declared parameters
    pub fn property_names(&self) -> Vec<String> {
        self.properties
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Trait for locally-implemented function bodies
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Execute the function with the given arguments
    async fn call(&self, args: Value) -> Result<Value>;
}

/// A function the assistant can invoke
#[derive(Clone)]
pub struct FunctionDefinition {
    /// Unique function name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// Parameter schema
    pub parameters: FunctionParameters,
    /// Local implementation, if any
    pub handler: Option<Arc<dyn FunctionHandler>>,
    /// UI component this function's result renders as
    pub ui_hint: Option<UiComponentKind>,
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .field("ui_hint", &self.ui_hint)
            .finish()
    }
}

impl FunctionDefinition {
    /// Create a definition with a local handler
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: FunctionParameters,
        handler: Arc<dyn FunctionHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Some(handler),
            ui_hint: None,
        }
    }

    /// Create a definition with no local handler (endpoint-only)
    pub fn remote(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: FunctionParameters,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: None,
            ui_hint: None,
        }
    }

    /// Set the UI hint, builder style
    pub fn with_ui_hint(mut self, hint: UiComponentKind) -> Self {
        self.ui_hint = Some(hint);
        self
    }

    /// Spec handed to providers that support function calling
    pub fn to_spec(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Outcome of a single function execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallResult {
    /// Whether the call succeeded
    pub success: bool,
    /// Result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error description on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FunctionCallResult {
    /// A successful result carrying data
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed result carrying an error description
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Render the result as a JSON value for message history
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Manifest entry served by a remote function registry
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFunctionEntry {
    /// Function name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// Parameter schema
    pub parameters: FunctionParameters,
    /// HTTP endpoint to POST arguments to
    pub endpoint: String,
    /// Component the function's result renders as, if any
    #[serde(default)]
    pub ui_hint: Option<UiComponentKind>,
}

/// Registry of every function the assistant can call
pub struct FunctionCatalog {
    functions: HashMap<String, Arc<FunctionDefinition>>,
    endpoints: HashMap<String, String>,
    allow_list: Vec<String>,
    http: reqwest::Client,
}

impl FunctionCatalog {
    /// Create an empty catalog that allows every registered function
    pub fn new() -> Self {
        Self::with_allow_list(Vec::new())
    }

    /// Create a catalog restricted to the named functions.
    ///
    /// An empty allow list means every registered function is callable.
    pub fn with_allow_list(allow_list: Vec<String>) -> Self {
        Self {
            functions: HashMap::new(),
            endpoints: HashMap::new(),
            allow_list,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Copy another catalog's registrations into a fresh, mutable catalog.
    ///
    /// Definitions are shared `Arc`s, so this is cheap. Used when a shared
    /// catalog handle needs an additive update (remote manifest merge).
    pub fn clone_registrations(other: &FunctionCatalog) -> Self {
        Self {
            functions: other.functions.clone(),
            endpoints: other.endpoints.clone(),
            allow_list: other.allow_list.clone(),
            http: other.http.clone(),
        }
    }

    /// Register a function. A later registration with the same name wins.
    pub fn register(&mut self, definition: FunctionDefinition) {
        tracing::debug!(
            target: "cortado.functions",
            function = %definition.name,
            "registering function"
        );
        self.functions
            .insert(definition.name.clone(), Arc::new(definition));
    }

    /// Route the named function through an HTTP endpoint
    pub fn set_endpoint(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.endpoints.insert(name.into(), url.into());
    }

    /// Whether the named function is registered
    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Look up a function definition
    pub fn get(&self, name: &str) -> Option<Arc<FunctionDefinition>> {
        self.functions.get(name).cloned()
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn is_allowed(&self, name: &str) -> bool {
        self.allow_list.is_empty() || self.allow_list.iter().any(|a| a == name)
    }

    /// Specs of every callable function, for providers that do function calls
    pub fn list_for_model(&self) -> Vec<FunctionSpec> {
        let mut specs: Vec<FunctionSpec> = self
            .functions
            .values()
            .filter(|d| self.is_allowed(&d.name))
            .map(|d| d.to_spec())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Execute a function by name.
    ///
    /// Never returns `Err`. Unknown or disallowed functions produce a
    /// "Function not found" failure. A configured endpoint is tried first;
    /// on any endpoint failure the local handler runs as a fallback.
    pub async fn execute(&self, name: &str, args: Value) -> FunctionCallResult {
        let definition = match self.functions.get(name) {
            Some(d) if self.is_allowed(name) => d,
            _ => {
                tracing::warn!(target: "cortado.functions", function = %name, "function not found or not allowed");
                return FunctionCallResult::failure("Function not found");
            }
        };

        if let Some(url) = self.endpoints.get(name) {
            match self.execute_remote(url, &args).await {
                Ok(result) => return result,
                Err(e) => {
                    tracing::warn!(
                        target: "cortado.functions",
                        function = %name,
                        error = %e,
                        "endpoint call failed, falling back to local handler"
                    );
                }
            }
        }

        match &definition.handler {
            Some(handler) => match handler.call(args).await {
                Ok(data) => FunctionCallResult::success(data),
                Err(e) => {
                    tracing::warn!(target: "cortado.functions", function = %name, error = %e, "handler failed");
                    FunctionCallResult::failure(e.to_string())
                }
            },
            None => FunctionCallResult::failure("Function not found"),
        }
    }

    async fn execute_remote(&self, url: &str, args: &Value) -> Result<FunctionCallResult> {
        let response = self.http.post(url).json(args).send().await?;
        let response = response.error_for_status()?;
        let data: Value = response.json().await?;
        Ok(FunctionCallResult::success(data))
    }

    /// Fetch a remote manifest and merge its functions additively.
    ///
    /// Remote entries never replace already-registered functions; a name
    /// collision is skipped with a warning. Returns the number of functions
    /// added.
    pub async fn load_remote(&mut self, manifest_url: &str) -> Result<usize> {
        tracing::info!(target: "cortado.functions", url = %manifest_url, "loading remote function manifest");

        let response = self.http.get(manifest_url).send().await?;
        let response = response.error_for_status()?;
        let entries: Vec<RemoteFunctionEntry> = response.json().await?;

        let mut added = 0;
        for entry in entries {
            if self.functions.contains_key(&entry.name) {
                tracing::warn!(
                    target: "cortado.functions",
                    function = %entry.name,
                    "remote function collides with registered function, skipping"
                );
                continue;
            }
            let name = entry.name.clone();
            let mut definition =
                FunctionDefinition::remote(entry.name, entry.description, entry.parameters);
            if let Some(hint) = entry.ui_hint {
                definition = definition.with_ui_hint(hint);
            }
            self.register(definition);
            self.set_endpoint(name, entry.endpoint);
            added += 1;
        }

        tracing::info!(target: "cortado.functions", added, "remote manifest merged");
        Ok(added)
    }
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedHandler(Value);

    #[async_trait]
    impl FunctionHandler for FixedHandler {
        async fn call(&self, _args: Value) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl FunctionHandler for FailingHandler {
        async fn call(&self, _args: Value) -> Result<Value> {
            Err(crate::error::CortadoError::Function("boom".to_string()))
        }
    }

    fn definition(name: &str) -> FunctionDefinition {
        FunctionDefinition::new(
            name,
            "test function",
            FunctionParameters::empty(),
            Arc::new(FixedHandler(json!({"ok": true}))),
        )
    }

    #[tokio::test]
    async fn test_execute_local_handler() {
        let mut catalog = FunctionCatalog::new();
        catalog.register(definition("get_loyalty_points"));

        let result = catalog.execute("get_loyalty_points", json!({})).await;
        assert!(result.success);
        assert_eq!(result.data, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_execute_unknown_function() {
        let catalog = FunctionCatalog::new();
        let result = catalog.execute("no_such_function", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Function not found"));
    }

    #[tokio::test]
    async fn test_execute_disallowed_function() {
        let mut catalog =
            FunctionCatalog::with_allow_list(vec!["get_loyalty_points".to_string()]);
        catalog.register(definition("get_loyalty_points"));
        catalog.register(definition("get_item_details"));

        let allowed = catalog.execute("get_loyalty_points", json!({})).await;
        assert!(allowed.success);

        let blocked = catalog.execute("get_item_details", json!({})).await;
        assert!(!blocked.success);
        assert_eq!(blocked.error.as_deref(), Some("Function not found"));
    }

    #[tokio::test]
    async fn test_empty_allow_list_allows_all() {
        let mut catalog = FunctionCatalog::with_allow_list(Vec::new());
        catalog.register(definition("anything"));
        assert!(catalog.execute("anything", json!({})).await.success);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_failure_result() {
        let mut catalog = FunctionCatalog::new();
        catalog.register(FunctionDefinition::new(
            "breaks",
            "always fails",
            FunctionParameters::empty(),
            Arc::new(FailingHandler),
        ));

        let result = catalog.execute("breaks", json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_endpoint_without_handler_and_dead_endpoint() {
        let mut catalog = FunctionCatalog::new();
        catalog.register(FunctionDefinition::remote(
            "remote_only",
            "endpoint only",
            FunctionParameters::empty(),
        ));
        catalog.set_endpoint("remote_only", "http://127.0.0.1:1/unreachable");

        let result = catalog.execute("remote_only", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Function not found"));
    }

    #[test]
    fn test_list_for_model_respects_allow_list() {
        let mut catalog = FunctionCatalog::with_allow_list(vec!["a".to_string()]);
        catalog.register(definition("a"));
        catalog.register(definition("b"));

        let specs = catalog.list_for_model();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "a");
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut catalog = FunctionCatalog::new();
        catalog.register(definition("dup"));
        let mut updated = definition("dup");
        updated.description = "newer".to_string();
        catalog.register(updated);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("dup").unwrap().description, "newer");
    }

    #[test]
    fn test_result_round_trip_value() {
        let result = FunctionCallResult::success(json!({"points": 3}));
        let value = result.to_value();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["data"]["points"], json!(3));
    }
}
