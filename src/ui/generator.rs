// SPDX-License-Identifier: AGPL-3.0-or-later

//! UI response generation
//!
//! Maps function results to renderable component descriptors and enriches
//! the response with suggested prompts and available actions. Suggestion and
//! action lookups are cached per user with a 5-minute TTL; within the window
//! the cached value is returned without touching the collaborator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::functions::builtin::{FN_ITEM_DETAILS, FN_SEARCH_MENU};
use crate::functions::FunctionCatalog;
use crate::orchestrator::ExecutedFunction;
use crate::profile::UserContext;
use crate::services::{ActionService, DayPart, SuggestionService};
use crate::ui::{AvailableAction, UiComponent, UiComponentKind};

/// Default cache time-to-live
pub const CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

struct TtlCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    // Last writer wins on overlapping writes. Stale entries are purged here
    // so keys that never get hit again cannot accumulate across a long
    // session.
    fn put(&self, key: String, value: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Builds the UI side of an `AiResponse`
pub struct UiGenerator {
    suggestions: Arc<dyn SuggestionService>,
    actions: Arc<dyn ActionService>,
    suggestion_cache: TtlCache<Vec<String>>,
    action_cache: TtlCache<Vec<AvailableAction>>,
}

impl UiGenerator {
    /// Create a generator with the default 5-minute TTL
    pub fn new(suggestions: Arc<dyn SuggestionService>, actions: Arc<dyn ActionService>) -> Self {
        Self::with_ttl(suggestions, actions, CACHE_TTL)
    }

    /// Create a generator with a custom TTL, mainly for tests
    pub fn with_ttl(
        suggestions: Arc<dyn SuggestionService>,
        actions: Arc<dyn ActionService>,
        ttl: Duration,
    ) -> Self {
        Self {
            suggestions,
            actions,
            suggestion_cache: TtlCache::new(ttl),
            action_cache: TtlCache::new(ttl),
        }
    }

    /// Map executed functions to component descriptors.
    ///
    /// Detail lookups and search carry payload shapes the generic path cannot
    /// express; every other function renders as the `ui_hint` its catalog
    /// definition declares, so remote-loaded functions get components too.
    /// Failed results and functions without a hint produce nothing.
    pub fn components(
        &self,
        executed: &[ExecutedFunction],
        catalog: &FunctionCatalog,
    ) -> Vec<UiComponent> {
        let mut components = Vec::new();
        for e in executed {
            if !e.result.success {
                continue;
            }
            let Some(data) = &e.result.data else { continue };

            match e.function_name.as_str() {
                FN_ITEM_DETAILS => {
                    if let Some(item) = data.get("item") {
                        components.push(UiComponent::new(UiComponentKind::Card, item.clone()));
                    }
                }
                // One detail card per search hit.
                FN_SEARCH_MENU => {
                    if let Some(results) = data.get("results").and_then(Value::as_array) {
                        for hit in results {
                            components
                                .push(UiComponent::new(UiComponentKind::Card, hit.clone()));
                        }
                    }
                }
                name => {
                    if let Some(hint) = catalog.get(name).and_then(|d| d.ui_hint) {
                        components.push(UiComponent::new(hint, data.clone()));
                    }
                }
            }
        }
        components
    }

    /// Suggested prompts, cached by `(user, day part)`
    pub async fn suggested_prompts(&self, message: &str, user: &UserContext) -> Vec<String> {
        let key = format!("{}:{}", user.user_id, DayPart::current());
        if let Some(cached) = self.suggestion_cache.get(&key) {
            tracing::debug!(target: "cortado.ui", key = %key, "suggestion cache hit");
            return cached;
        }

        let prompts = match self.suggestions.suggested_prompts(message, user).await {
            Ok(prompts) => prompts,
            Err(e) => {
                tracing::warn!(target: "cortado.ui", error = %e, "suggestion service failed");
                Vec::new()
            }
        };
        self.suggestion_cache.put(key, prompts.clone());
        prompts
    }

    /// Available actions, cached by `(user, content fingerprint)`
    pub async fn available_actions(
        &self,
        message: &str,
        user: &UserContext,
    ) -> Vec<AvailableAction> {
        let key = format!("{}:{}", user.user_id, fingerprint(message));
        if let Some(cached) = self.action_cache.get(&key) {
            tracing::debug!(target: "cortado.ui", key = %key, "action cache hit");
            return cached;
        }

        let actions = match self.actions.available_actions(message, user).await {
            Ok(actions) => actions,
            Err(e) => {
                tracing::warn!(target: "cortado.ui", error = %e, "action service failed");
                Vec::new()
            }
        };
        self.action_cache.put(key, actions.clone());
        actions
    }
}

/// Short, stable fingerprint of message content.
///
/// Collisions only cost a slightly stale action list within the TTL window,
/// so a simple FNV-1a over the lowercased text is plenty.
fn fingerprint(message: &str) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in message.to_lowercase().bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::Result;
    use crate::functions::builtin::{
        register_core_functions, FN_LOYALTY_POINTS, FN_MENU_RECOMMENDATIONS, FN_USER_PREFERENCES,
    };
    use crate::functions::{FunctionCallResult, FunctionDefinition, FunctionParameters};
    use crate::services::static_data::StaticCatalog;

    fn core_catalog() -> FunctionCatalog {
        let mut catalog = FunctionCatalog::new();
        register_core_functions(&mut catalog, Arc::new(StaticCatalog::new()));
        catalog
    }

    struct CountingSuggestions {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SuggestionService for CountingSuggestions {
        async fn suggested_prompts(
            &self,
            _message: &str,
            _user: &UserContext,
        ) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["Try the cappuccino".to_string()])
        }
    }

    struct CountingActions {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActionService for CountingActions {
        async fn available_actions(
            &self,
            _message: &str,
            _user: &UserContext,
        ) -> Result<Vec<AvailableAction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![AvailableAction::new("view_menu", "Menu", json!({}))])
        }
    }

    fn generator_with_ttl(
        ttl: Duration,
    ) -> (UiGenerator, Arc<CountingSuggestions>, Arc<CountingActions>) {
        let suggestions = Arc::new(CountingSuggestions {
            calls: AtomicUsize::new(0),
        });
        let actions = Arc::new(CountingActions {
            calls: AtomicUsize::new(0),
        });
        let generator = UiGenerator::with_ttl(suggestions.clone(), actions.clone(), ttl);
        (generator, suggestions, actions)
    }

    fn executed(name: &str, data: Value) -> ExecutedFunction {
        ExecutedFunction {
            function_name: name.to_string(),
            result: FunctionCallResult::success(data),
        }
    }

    #[test]
    fn test_component_mapping_follows_ui_hints() {
        let (generator, _, _) = generator_with_ttl(CACHE_TTL);
        let components = generator.components(
            &[
                executed(FN_LOYALTY_POINTS, json!({"points": 3})),
                executed(FN_MENU_RECOMMENDATIONS, json!({"items": []})),
                executed(FN_USER_PREFERENCES, json!({"preferences": []})),
            ],
            &core_catalog(),
        );

        let kinds: Vec<UiComponentKind> = components.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UiComponentKind::Card,
                UiComponentKind::Carousel,
                UiComponentKind::Panel
            ]
        );
    }

    #[test]
    fn test_search_produces_one_card_per_hit() {
        let (generator, _, _) = generator_with_ttl(CACHE_TTL);
        let components = generator.components(
            &[executed(
                FN_SEARCH_MENU,
                json!({"results": [{"id": "coffee-1"}, {"id": "coffee-2"}, {"id": "tea-1"}]}),
            )],
            &core_catalog(),
        );
        assert_eq!(components.len(), 3);
        assert!(components.iter().all(|c| c.kind == UiComponentKind::Card));
    }

    #[test]
    fn test_unhinted_and_failed_functions_produce_nothing() {
        let (generator, _, _) = generator_with_ttl(CACHE_TTL);
        let components = generator.components(
            &[
                executed("some_remote_custom_function", json!({"x": 1})),
                ExecutedFunction {
                    function_name: FN_LOYALTY_POINTS.to_string(),
                    result: FunctionCallResult::failure("down"),
                },
            ],
            &core_catalog(),
        );
        assert!(components.is_empty());
    }

    #[test]
    fn test_hinted_remote_function_renders() {
        let (generator, _, _) = generator_with_ttl(CACHE_TTL);
        let mut catalog = core_catalog();
        catalog.register(
            FunctionDefinition::remote(
                "check_gift_card",
                "gift card balance",
                FunctionParameters::empty(),
            )
            .with_ui_hint(UiComponentKind::Card),
        );

        let components = generator.components(
            &[executed("check_gift_card", json!({"balance": 25.0}))],
            &catalog,
        );
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].kind, UiComponentKind::Card);
        assert_eq!(components[0].data["balance"], json!(25.0));
    }

    #[tokio::test]
    async fn test_suggestion_cache_within_ttl() {
        let (generator, suggestions, _) = generator_with_ttl(CACHE_TTL);
        let user = UserContext::new("u-1");

        let first = generator.suggested_prompts("hi", &user).await;
        let second = generator.suggested_prompts("different message", &user).await;

        assert_eq!(first, second);
        assert_eq!(suggestions.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_suggestion_cache_expires() {
        let (generator, suggestions, _) = generator_with_ttl(Duration::from_millis(20));
        let user = UserContext::new("u-1");

        generator.suggested_prompts("hi", &user).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        generator.suggested_prompts("hi", &user).await;

        assert_eq!(suggestions.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_suggestion_cache_is_per_user() {
        let (generator, suggestions, _) = generator_with_ttl(CACHE_TTL);

        generator
            .suggested_prompts("hi", &UserContext::new("u-1"))
            .await;
        generator
            .suggested_prompts("hi", &UserContext::new("u-2"))
            .await;

        assert_eq!(suggestions.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_action_cache_keyed_on_content() {
        let (generator, _, actions) = generator_with_ttl(CACHE_TTL);
        let user = UserContext::new("u-1");

        generator.available_actions("order a latte", &user).await;
        generator.available_actions("order a latte", &user).await;
        assert_eq!(actions.calls.load(Ordering::SeqCst), 1);

        // Different content, different fingerprint, fresh lookup.
        generator.available_actions("show my points", &user).await;
        assert_eq!(actions.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_action_cache_purges_expired_keys() {
        let (generator, _, _) = generator_with_ttl(Duration::from_millis(20));
        let user = UserContext::new("u-1");

        // Distinct messages produce distinct fingerprint keys.
        generator.available_actions("first message", &user).await;
        generator.available_actions("second message", &user).await;
        assert_eq!(generator.action_cache.len(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        generator.available_actions("third message", &user).await;

        // The two stale keys were dropped by the write, not just shadowed.
        assert_eq!(generator.action_cache.len(), 1);
    }

    #[test]
    fn test_cache_recovers_from_poisoned_lock() {
        let cache: TtlCache<u32> = TtlCache::new(CACHE_TTL);
        cache.put("before".to_string(), 1);

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = cache.entries.lock().unwrap();
            panic!("poisoning");
        }));

        // Reads and writes keep working after a panic mid-critical-section.
        assert_eq!(cache.get("before"), Some(1));
        cache.put("after".to_string(), 2);
        assert_eq!(cache.get("after"), Some(2));
    }

    #[test]
    fn test_fingerprint_stability() {
        assert_eq!(fingerprint("Order a Latte"), fingerprint("order a latte"));
        assert_ne!(fingerprint("latte"), fingerprint("cappuccino"));
    }
}
