// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory service implementations
//!
//! These back the binary out of the box and give the tests deterministic
//! data. A real deployment swaps these for database- or API-backed
//! implementations of the same traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CortadoError, Result};
use crate::profile::UserContext;
use crate::services::{
    ActionService, CatalogService, DayPart, MenuItem, Product, PromptTemplateService,
    SuggestionService, TEMPLATE_ACTION_GENERATION, TEMPLATE_FUNCTION_SELECTION,
    TEMPLATE_PARAM_EXTRACTION, TEMPLATE_RAG_CONTEXT, TEMPLATE_SUGGESTION_GENERATION,
    TEMPLATE_SYSTEM,
};
use crate::ui::AvailableAction;

/// Catalog backed by a fixed menu and product list
pub struct StaticCatalog {
    menu: Vec<MenuItem>,
    products: Vec<Product>,
    loyalty: Mutex<HashMap<String, u32>>,
    interactions: Mutex<Vec<(String, String)>>,
}

impl StaticCatalog {
    /// Build the default café catalog
    pub fn new() -> Self {
        let menu = vec![
            menu_item("coffee-1", "Espresso", "coffee", "A short, intense shot.", 2.20, vec![]),
            menu_item(
                "coffee-2",
                "Cappuccino",
                "coffee",
                "Espresso with steamed milk and a cap of foam.",
                3.50,
                vec![DayPart::Morning],
            ),
            menu_item(
                "coffee-3",
                "Latte",
                "coffee",
                "Espresso with plenty of steamed milk.",
                3.80,
                vec![],
            ),
            menu_item(
                "coffee-4",
                "Cortado",
                "coffee",
                "Espresso cut with an equal part of warm milk.",
                3.20,
                vec![],
            ),
            menu_item("tea-1", "Earl Grey", "tea", "Black tea with bergamot.", 2.80, vec![]),
            menu_item(
                "tea-2",
                "Chamomile",
                "tea",
                "Caffeine-free herbal infusion.",
                2.80,
                vec![DayPart::Evening],
            ),
            menu_item(
                "pastry-1",
                "Cornetto",
                "pastry",
                "Italian-style breakfast pastry.",
                1.80,
                vec![DayPart::Morning],
            ),
            menu_item(
                "pastry-2",
                "Croissant",
                "pastry",
                "Butter croissant, baked daily.",
                2.00,
                vec![DayPart::Morning],
            ),
            menu_item(
                "sandwich-1",
                "Panini",
                "sandwich",
                "Grilled panini with mozzarella and tomato.",
                5.50,
                vec![DayPart::Afternoon],
            ),
        ];

        let products = vec![
            product("beans-1", "House Blend Beans", "beans", "250g of our house espresso blend.", 9.50),
            product("beans-2", "Single Origin Ethiopia", "beans", "250g, washed, floral and bright.", 12.00),
            product("equipment-1", "Moka Pot", "equipment", "Classic 3-cup stovetop brewer.", 24.00),
            product("merch-1", "Ceramic Mug", "merch", "Stoneware mug with the shop logo.", 14.00),
        ];

        Self {
            menu,
            products,
            loyalty: Mutex::new(HashMap::new()),
            interactions: Mutex::new(Vec::new()),
        }
    }

    /// Seed a loyalty balance, mainly for tests
    pub fn set_loyalty_points(&self, user_id: &str, points: u32) {
        self.loyalty
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(user_id.to_string(), points);
    }

    /// Interactions recorded so far, mainly for tests
    pub fn recorded_interactions(&self) -> Vec<(String, String)> {
        self.interactions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

fn menu_item(
    id: &str,
    name: &str,
    category: &str,
    description: &str,
    price: f64,
    day_parts: Vec<DayPart>,
) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        price,
        day_parts,
    }
}

fn product(id: &str, name: &str, category: &str, description: &str, price: f64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        price,
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogService for StaticCatalog {
    async fn get_menu_items(&self) -> Result<Vec<MenuItem>> {
        Ok(self.menu.clone())
    }

    async fn get_products(&self, category: &str) -> Result<Vec<Product>> {
        if category.is_empty() || category == "all" {
            return Ok(self.products.clone());
        }
        Ok(self
            .products
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }

    async fn get_menu_item_by_id(&self, id: &str) -> Result<Option<MenuItem>> {
        Ok(self.menu.iter().find(|m| m.id == id).cloned())
    }

    async fn get_product_by_id(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = self.menu.iter().map(|m| m.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn get_loyalty_points(&self, user_id: &str) -> Result<u32> {
        Ok(self
            .loyalty
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(user_id)
            .copied()
            .unwrap_or(0))
    }

    async fn record_interaction(&self, user_id: &str, interaction: &str) -> Result<()> {
        self.interactions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((user_id.to_string(), interaction.to_string()));
        Ok(())
    }
}

/// Suggestion provider with fixed, day-part-aware prompts
pub struct StaticSuggestions;

#[async_trait]
impl SuggestionService for StaticSuggestions {
    async fn suggested_prompts(&self, _message: &str, _user: &UserContext) -> Result<Vec<String>> {
        let mut prompts = vec![
            "What do you recommend right now?".to_string(),
            "How many loyalty points do I have?".to_string(),
        ];
        match DayPart::current() {
            DayPart::Morning => prompts.push("What goes well with a cappuccino?".to_string()),
            DayPart::Afternoon => prompts.push("Anything light for lunch?".to_string()),
            DayPart::Evening => prompts.push("Do you have anything caffeine-free?".to_string()),
        }
        Ok(prompts)
    }
}

/// Action provider with fixed keyword-driven actions
pub struct StaticActions;

#[async_trait]
impl ActionService for StaticActions {
    async fn available_actions(
        &self,
        message: &str,
        _user: &UserContext,
    ) -> Result<Vec<AvailableAction>> {
        let lower = message.to_lowercase();
        let mut actions = Vec::new();
        if lower.contains("order") || lower.contains("buy") {
            actions.push(AvailableAction::new(
                "start_order",
                "Start an order",
                serde_json::json!({}),
            ));
        }
        if lower.contains("point") || lower.contains("loyalty") {
            actions.push(AvailableAction::new(
                "view_loyalty",
                "View loyalty card",
                serde_json::json!({}),
            ));
        }
        actions.push(AvailableAction::new(
            "view_menu",
            "Browse the menu",
            serde_json::json!({}),
        ));
        Ok(actions)
    }
}

/// Template service over an in-memory map with `{{key}}` substitution
pub struct StaticTemplates {
    templates: HashMap<String, String>,
}

impl StaticTemplates {
    /// Build the default template set
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            TEMPLATE_SYSTEM.to_string(),
            "You are the virtual assistant for {{business_name}}. {{business_description}} \
             Keep your tone {{business_tone}}. Answer only from the facts you are given."
                .to_string(),
        );
        templates.insert(
            TEMPLATE_FUNCTION_SELECTION.to_string(),
            "Given the user message below, decide which of these functions should run:\n\
             {{functions}}\n\nUser message: {{message}}\n{{user_context}}\n\
             Respond with a JSON array of function names, e.g. [\"get_loyalty_points\"]. \
             Respond with [] if none apply."
                .to_string(),
        );
        templates.insert(
            TEMPLATE_PARAM_EXTRACTION.to_string(),
            "Extract arguments for the function {{function_name}} from the user message.\n\
             Parameter schema: {{parameters}}\n\nUser message: {{message}}\n{{user_context}}\n\
             Respond with a single JSON object containing the arguments."
                .to_string(),
        );
        templates.insert(
            TEMPLATE_RAG_CONTEXT.to_string(),
            "Answer the user's message using only the facts below.\n\
             Facts:\n{{facts}}\n\nRecent conversation:\n{{history}}\n\n\
             {{user_context}}\n\nUser message: {{message}}"
                .to_string(),
        );
        templates.insert(
            TEMPLATE_ACTION_GENERATION.to_string(),
            "Suggest up to three UI actions relevant to this message: {{message}}".to_string(),
        );
        templates.insert(
            TEMPLATE_SUGGESTION_GENERATION.to_string(),
            "Suggest three short follow-up prompts for this conversation: {{message}}".to_string(),
        );
        Self { templates }
    }

    /// Override or add a template, mainly for tests
    pub fn set(&mut self, id: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(id.into(), body.into());
    }
}

impl Default for StaticTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptTemplateService for StaticTemplates {
    fn prompt(&self, template_id: &str, context: &Value) -> Result<String> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| CortadoError::Template(format!("unknown template: {}", template_id)))?;
        Ok(render(template, context))
    }
}

/// Substitute `{{key}}` placeholders from the context object.
///
/// Unknown placeholders render as empty strings so a sparse context never
/// fails a prompt render.
fn render(template: &str, context: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match context.get(key) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {}
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_catalog_lookup_by_id() {
        let catalog = StaticCatalog::new();
        let item = catalog.get_menu_item_by_id("coffee-2").await.unwrap().unwrap();
        assert_eq!(item.name, "Cappuccino");
        assert!(catalog.get_menu_item_by_id("coffee-99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_search_by_name() {
        let catalog = StaticCatalog::new();
        let hits = catalog.search_menu_by_name("cappuccino").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "coffee-2");

        let none = catalog.search_menu_by_name("flat white").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_product_category_filter() {
        let catalog = StaticCatalog::new();
        assert_eq!(catalog.get_products("all").await.unwrap().len(), 4);
        let beans = catalog.get_products("beans").await.unwrap();
        assert_eq!(beans.len(), 2);
        assert!(beans.iter().all(|p| p.category == "beans"));
    }

    #[tokio::test]
    async fn test_loyalty_defaults_to_zero() {
        let catalog = StaticCatalog::new();
        assert_eq!(catalog.get_loyalty_points("u-1").await.unwrap(), 0);
        catalog.set_loyalty_points("u-1", 120);
        assert_eq!(catalog.get_loyalty_points("u-1").await.unwrap(), 120);
    }

    #[tokio::test]
    async fn test_record_interaction() {
        let catalog = StaticCatalog::new();
        catalog.record_interaction("u-1", "asked about decaf").await.unwrap();
        let recorded = catalog.recorded_interactions();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, "asked about decaf");
    }

    #[test]
    fn test_template_render_substitutes_known_keys() {
        let templates = StaticTemplates::new();
        let out = templates
            .prompt(
                TEMPLATE_SYSTEM,
                &json!({
                    "business_name": "Cortado",
                    "business_description": "A café.",
                    "business_tone": "warm"
                }),
            )
            .unwrap();
        assert!(out.contains("Cortado"));
        assert!(out.contains("warm"));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_template_unknown_placeholder_renders_empty() {
        let out = render("a {{missing}} b", &json!({}));
        assert_eq!(out, "a  b");
    }

    #[test]
    fn test_template_unknown_id_errors() {
        let templates = StaticTemplates::new();
        assert!(templates.prompt("nope", &json!({})).is_err());
    }

    #[tokio::test]
    async fn test_static_actions_keyed_on_message() {
        let actions = StaticActions;
        let user = UserContext::new("u-1");
        let result = actions
            .available_actions("how many loyalty points do I have", &user)
            .await
            .unwrap();
        assert!(result.iter().any(|a| a.action_type == "view_loyalty"));
        assert!(result.iter().any(|a| a.action_type == "view_menu"));
    }
}
