// SPDX-License-Identifier: AGPL-3.0-or-later

//! Domain service traits
//!
//! The engine talks to the business through these traits: the catalog of
//! menu items and retail products, suggestion and action providers for UI
//! enrichment, and a template service for every prompt the engine renders.
//! `static_data` holds the in-memory implementations used by the binary and
//! the tests.

pub mod static_data;

use async_trait::async_trait;
use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::profile::UserContext;
use crate::ui::AvailableAction;

/// Template id for the conversation system prompt
pub const TEMPLATE_SYSTEM: &str = "system";
/// Template id for LLM-guided function selection
pub const TEMPLATE_FUNCTION_SELECTION: &str = "function_selection";
/// Template id for LLM-guided parameter extraction
pub const TEMPLATE_PARAM_EXTRACTION: &str = "function_param_extraction";
/// Template id for the grounded-reply prompt
pub const TEMPLATE_RAG_CONTEXT: &str = "rag_context";
/// Template id for contextual action generation
pub const TEMPLATE_ACTION_GENERATION: &str = "action_generation";
/// Template id for suggested-prompt generation
pub const TEMPLATE_SUGGESTION_GENERATION: &str = "suggestion_generation";

/// A menu item served on premises
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    /// Stable identifier, e.g. "coffee-2"
    pub id: String,
    /// Display name
    pub name: String,
    /// Category, e.g. "coffee", "tea", "pastry"
    pub category: String,
    /// Short description
    pub description: String,
    /// Price in the store currency
    pub price: f64,
    /// Day parts this item is recommended for; empty means any time
    #[serde(default)]
    pub day_parts: Vec<DayPart>,
}

/// A retail product sold to take home
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier, e.g. "beans-1"
    pub id: String,
    /// Display name
    pub name: String,
    /// Category, e.g. "beans", "equipment", "merch"
    pub category: String,
    /// Short description
    pub description: String,
    /// Price in the store currency
    pub price: f64,
}

/// Coarse time-of-day bucket used for recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    /// 05:00 through 11:59
    Morning,
    /// 12:00 through 17:59
    Afternoon,
    /// Everything else
    Evening,
}

impl DayPart {
    /// Bucket for the current local time
    pub fn current() -> Self {
        Self::from_hour(Local::now().hour())
    }

    /// Bucket for the given hour of day
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

impl std::fmt::Display for DayPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayPart::Morning => write!(f, "morning"),
            DayPart::Afternoon => write!(f, "afternoon"),
            DayPart::Evening => write!(f, "evening"),
        }
    }
}

/// Access to the business's menu and retail catalog
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// All menu items
    async fn get_menu_items(&self) -> Result<Vec<MenuItem>>;

    /// Retail products, optionally filtered by category ("all" means no filter)
    async fn get_products(&self, category: &str) -> Result<Vec<Product>>;

    /// Menu item lookup by id
    async fn get_menu_item_by_id(&self, id: &str) -> Result<Option<MenuItem>>;

    /// Product lookup by id
    async fn get_product_by_id(&self, id: &str) -> Result<Option<Product>>;

    /// Distinct menu categories
    async fn list_categories(&self) -> Result<Vec<String>>;

    /// Menu items whose name contains the query, case-insensitive
    async fn search_menu_by_name(&self, query: &str) -> Result<Vec<MenuItem>> {
        let needle = query.to_lowercase();
        Ok(self
            .get_menu_items()
            .await?
            .into_iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Loyalty point balance for the user
    async fn get_loyalty_points(&self, user_id: &str) -> Result<u32>;

    /// Record a notable interaction for later personalization
    async fn record_interaction(&self, user_id: &str, interaction: &str) -> Result<()>;
}

/// Produces follow-up prompts to offer the user
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Suggested prompts for the given message and user
    async fn suggested_prompts(&self, message: &str, user: &UserContext) -> Result<Vec<String>>;
}

/// Produces contextual actions the UI can surface as buttons
#[async_trait]
pub trait ActionService: Send + Sync {
    /// Actions relevant to the given message and user
    async fn available_actions(
        &self,
        message: &str,
        user: &UserContext,
    ) -> Result<Vec<AvailableAction>>;
}

/// Renders prompt templates by id.
///
/// Context values are substituted for `{{key}}` placeholders. Unknown
/// template ids are an error; unknown placeholders render empty.
pub trait PromptTemplateService: Send + Sync {
    /// Render the identified template with the given context
    fn prompt(&self, template_id: &str, context: &Value) -> Result<String>;
}
