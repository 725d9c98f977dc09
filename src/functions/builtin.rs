// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core function set
//!
//! The functions every deployment gets, registered unconditionally before
//! any remote manifest is merged. Each handler wraps the injected
//! `CatalogService`; none of them touch global state.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{CortadoError, Result};
use crate::functions::schema::SchemaBuilder;
use crate::functions::{FunctionCatalog, FunctionDefinition, FunctionHandler};
use crate::services::{CatalogService, DayPart};
use crate::ui::UiComponentKind;

/// Name of the loyalty balance function
pub const FN_LOYALTY_POINTS: &str = "get_loyalty_points";
/// Name of the menu recommendation function
pub const FN_MENU_RECOMMENDATIONS: &str = "get_menu_recommendations";
/// Name of the retail product recommendation function
pub const FN_PRODUCT_RECOMMENDATIONS: &str = "get_product_recommendations";
/// Name of the search-by-name function, also used for entity resolution
pub const FN_SEARCH_MENU: &str = "search_menu_by_name";
/// Name of the item detail lookup function
pub const FN_ITEM_DETAILS: &str = "get_item_details";
/// Name of the user preference function
pub const FN_USER_PREFERENCES: &str = "get_user_preferences";
/// Name of the interaction recording function
pub const FN_RECORD_INTERACTION: &str = "record_user_interaction";

/// Register every core function on the catalog.
///
/// Core functions always go in first so a remote manifest can never clobber
/// them.
pub fn register_core_functions(catalog: &mut FunctionCatalog, services: Arc<dyn CatalogService>) {
    catalog.register(
        FunctionDefinition::new(
            FN_LOYALTY_POINTS,
            "Get the user's current loyalty point balance",
            SchemaBuilder::new()
                .string("userId", "The user's identifier", true)
                .build(),
            Arc::new(LoyaltyPointsHandler {
                services: services.clone(),
            }),
        )
        .with_ui_hint(UiComponentKind::Card),
    );

    catalog.register(
        FunctionDefinition::new(
            FN_MENU_RECOMMENDATIONS,
            "Recommend menu items for a time of day and category",
            SchemaBuilder::new()
                .string_enum(
                    "timeOfDay",
                    "Which part of the day to recommend for",
                    &["morning", "afternoon", "evening"],
                    true,
                )
                .string_enum(
                    "category",
                    "Menu category to restrict to",
                    &["all", "coffee", "tea", "pastry", "sandwich"],
                    true,
                )
                .build(),
            Arc::new(MenuRecommendationsHandler {
                services: services.clone(),
            }),
        )
        .with_ui_hint(UiComponentKind::Carousel),
    );

    catalog.register(
        FunctionDefinition::new(
            FN_PRODUCT_RECOMMENDATIONS,
            "Recommend retail products to take home",
            SchemaBuilder::new()
                .string_enum(
                    "category",
                    "Product category to restrict to",
                    &["all", "beans", "equipment", "merch"],
                    true,
                )
                .build(),
            Arc::new(ProductRecommendationsHandler {
                services: services.clone(),
            }),
        )
        .with_ui_hint(UiComponentKind::Carousel),
    );

    catalog.register(
        FunctionDefinition::new(
            FN_SEARCH_MENU,
            "Search menu items by name",
            SchemaBuilder::new()
                .string("query", "Name or partial name to search for", true)
                .build(),
            Arc::new(SearchMenuHandler {
                services: services.clone(),
            }),
        )
        .with_ui_hint(UiComponentKind::Card),
    );

    catalog.register(
        FunctionDefinition::new(
            FN_ITEM_DETAILS,
            "Get full details for a menu item or product by its identifier",
            SchemaBuilder::new()
                .string("itemId", "Stable item identifier, e.g. coffee-2", true)
                .build(),
            Arc::new(ItemDetailsHandler {
                services: services.clone(),
            }),
        )
        .with_ui_hint(UiComponentKind::Card),
    );

    catalog.register(
        FunctionDefinition::new(
            FN_USER_PREFERENCES,
            "Get the user's stored preferences and dietary restrictions",
            SchemaBuilder::new()
                .string("userId", "The user's identifier", true)
                .string_array("preferences", "Known preferences", false)
                .string_array("dietaryRestrictions", "Known dietary restrictions", false)
                .build(),
            Arc::new(UserPreferencesHandler),
        )
        .with_ui_hint(UiComponentKind::Panel),
    );

    catalog.register(FunctionDefinition::new(
        FN_RECORD_INTERACTION,
        "Record a notable user interaction for later personalization",
        SchemaBuilder::new()
            .string("userId", "The user's identifier", true)
            .string("interaction", "What happened, in one sentence", true)
            .build(),
        Arc::new(RecordInteractionHandler { services }),
    ));
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CortadoError::Function(format!("missing required argument: {}", key)))
}

struct LoyaltyPointsHandler {
    services: Arc<dyn CatalogService>,
}

#[async_trait]
impl FunctionHandler for LoyaltyPointsHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let user_id = required_str(&args, "userId")?;
        let points = self.services.get_loyalty_points(user_id).await?;
        Ok(json!({"userId": user_id, "points": points}))
    }
}

struct MenuRecommendationsHandler {
    services: Arc<dyn CatalogService>,
}

#[async_trait]
impl FunctionHandler for MenuRecommendationsHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let time_of_day = args
            .get("timeOfDay")
            .and_then(Value::as_str)
            .unwrap_or("morning");
        let category = args.get("category").and_then(Value::as_str).unwrap_or("all");

        let day_part = match time_of_day {
            "morning" => DayPart::Morning,
            "afternoon" => DayPart::Afternoon,
            _ => DayPart::Evening,
        };

        let items: Vec<Value> = self
            .services
            .get_menu_items()
            .await?
            .into_iter()
            .filter(|item| category == "all" || item.category == category)
            .filter(|item| item.day_parts.is_empty() || item.day_parts.contains(&day_part))
            .map(|item| serde_json::to_value(item).unwrap_or(Value::Null))
            .collect();

        Ok(json!({"timeOfDay": time_of_day, "category": category, "items": items}))
    }
}

struct ProductRecommendationsHandler {
    services: Arc<dyn CatalogService>,
}

#[async_trait]
impl FunctionHandler for ProductRecommendationsHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let category = args.get("category").and_then(Value::as_str).unwrap_or("all");
        let products = self.services.get_products(category).await?;
        Ok(json!({"category": category, "products": products}))
    }
}

struct SearchMenuHandler {
    services: Arc<dyn CatalogService>,
}

#[async_trait]
impl FunctionHandler for SearchMenuHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let query = required_str(&args, "query")?;
        let results = self.services.search_menu_by_name(query).await?;
        Ok(json!({"query": query, "results": results}))
    }
}

struct ItemDetailsHandler {
    services: Arc<dyn CatalogService>,
}

#[async_trait]
impl FunctionHandler for ItemDetailsHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let item_id = required_str(&args, "itemId")?;

        if let Some(item) = self.services.get_menu_item_by_id(item_id).await? {
            return Ok(json!({"itemType": "menu", "item": item}));
        }
        if let Some(product) = self.services.get_product_by_id(item_id).await? {
            return Ok(json!({"itemType": "product", "item": product}));
        }

        Err(CortadoError::Function(format!("Item not found: {}", item_id)))
    }
}

struct UserPreferencesHandler;

#[async_trait]
impl FunctionHandler for UserPreferencesHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let user_id = required_str(&args, "userId")?;
        // The profile is owned by an external collaborator; the extraction
        // step passes its contents through as arguments.
        Ok(json!({
            "userId": user_id,
            "preferences": args.get("preferences").cloned().unwrap_or(json!([])),
            "dietaryRestrictions": args
                .get("dietaryRestrictions")
                .cloned()
                .unwrap_or(json!([])),
        }))
    }
}

struct RecordInteractionHandler {
    services: Arc<dyn CatalogService>,
}

#[async_trait]
impl FunctionHandler for RecordInteractionHandler {
    async fn call(&self, args: Value) -> Result<Value> {
        let user_id = required_str(&args, "userId")?;
        let interaction = required_str(&args, "interaction")?;
        self.services.record_interaction(user_id, interaction).await?;
        Ok(json!({"recorded": true, "userId": user_id}))
    }
}
