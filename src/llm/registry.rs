// SPDX-License-Identifier: AGPL-3.0-or-later

//! Provider registry
//!
//! Explicitly constructed, dependency-injected map of named providers. The
//! lookup never fails: an unregistered name falls back to the deterministic
//! offline provider, so provider selection can never take down a session.

use std::collections::HashMap;
use std::sync::Arc;

use crate::llm::offline::OfflineProvider;
use crate::llm::provider::AiProvider;

/// Name-keyed registry of model providers
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AiProvider>>,
    fallback: Arc<dyn AiProvider>,
}

impl ProviderRegistry {
    /// Create a registry with only the offline fallback
    pub fn new() -> Self {
        let fallback: Arc<dyn AiProvider> = Arc::new(OfflineProvider::new());
        let mut providers: HashMap<String, Arc<dyn AiProvider>> = HashMap::new();
        providers.insert("offline".to_string(), fallback.clone());
        Self {
            providers,
            fallback,
        }
    }

    /// Register a provider under its own name
    pub fn register(&mut self, provider: Arc<dyn AiProvider>) {
        self.register_as(provider.name().to_string(), provider);
    }

    /// Register a provider under an explicit name
    pub fn register_as(&mut self, name: impl Into<String>, provider: Arc<dyn AiProvider>) {
        let name = name.into();
        tracing::debug!(target: "cortado.registry", provider = %name, "registering provider");
        self.providers.insert(name, provider);
    }

    /// Look up a provider by name.
    ///
    /// Unknown names return the offline fallback rather than failing.
    pub fn get(&self, name: &str) -> Arc<dyn AiProvider> {
        match self.providers.get(name) {
            Some(provider) => provider.clone(),
            None => {
                tracing::warn!(
                    target: "cortado.registry",
                    provider = %name,
                    "unknown provider requested, using offline fallback"
                );
                self.fallback.clone()
            }
        }
    }

    /// Whether the named provider is registered
    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Names of all registered providers, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
