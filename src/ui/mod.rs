// SPDX-License-Identifier: AGPL-3.0-or-later

//! Response types handed back to the rendering layer
//!
//! The engine only produces descriptors; rendering chat bubbles, carousels
//! and cards is the front-end's job.

pub mod generator;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::llm::message::Message;

/// The externally visible result of one `send_message` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    /// The assistant's reply
    pub message: Message,

    /// Renderable data cards derived from function results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ui_components: Vec<UiComponent>,

    /// Follow-up prompts to offer the user
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_prompts: Vec<String>,

    /// Contextual actions the UI can surface as buttons
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_actions: Vec<AvailableAction>,
}

impl AiResponse {
    /// A bare response carrying only an assistant message
    pub fn message_only(message: Message) -> Self {
        Self {
            message,
            ui_components: Vec::new(),
            suggested_prompts: Vec::new(),
            available_actions: Vec::new(),
        }
    }
}

/// Advisory descriptor for a renderable component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiComponent {
    /// Stable identifier for reconciliation in the front end
    pub id: Uuid,

    /// What kind of component to render, serialized as `type` on the wire
    #[serde(rename = "type")]
    pub kind: UiComponentKind,

    /// Component payload, shape depends on `kind`
    pub data: Value,

    /// Where the component should appear
    pub placement: Placement,
}

impl UiComponent {
    /// Create a component with the kind's default placement
    pub fn new(kind: UiComponentKind, data: Value) -> Self {
        let placement = kind.default_placement();
        Self {
            id: Uuid::new_v4(),
            kind,
            data,
            placement,
        }
    }
}

/// Kinds of components the engine knows how to describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiComponentKind {
    /// Single data card (loyalty balance, item detail)
    Card,
    /// Horizontal scroll of items (recommendations)
    Carousel,
    /// Sidebar panel (preferences)
    Panel,
}

impl UiComponentKind {
    fn default_placement(self) -> Placement {
        match self {
            UiComponentKind::Card => Placement::Inline,
            UiComponentKind::Carousel => Placement::Bottom,
            UiComponentKind::Panel => Placement::Sidebar,
        }
    }
}

/// Where a component should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Within the chat flow
    Inline,
    /// In the side panel
    Sidebar,
    /// Pinned under the conversation
    Bottom,
}

/// A contextual action offered to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableAction {
    /// Machine-readable action type
    #[serde(rename = "type")]
    pub action_type: String,

    /// Human-readable label
    pub title: String,

    /// Opaque payload forwarded when the action is taken
    pub payload: Value,
}

impl AvailableAction {
    /// Create an action descriptor
    pub fn new(action_type: impl Into<String>, title: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            title: title.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_default_placements() {
        let card = UiComponent::new(UiComponentKind::Card, json!({}));
        let carousel = UiComponent::new(UiComponentKind::Carousel, json!({}));
        let panel = UiComponent::new(UiComponentKind::Panel, json!({}));

        assert_eq!(card.placement, Placement::Inline);
        assert_eq!(carousel.placement, Placement::Bottom);
        assert_eq!(panel.placement, Placement::Sidebar);
    }

    #[test]
    fn test_component_kind_serializes_as_type() {
        let component = UiComponent::new(UiComponentKind::Carousel, json!({"items": []}));
        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["type"], "carousel");
        assert!(value.get("kind").is_none());
        assert_eq!(value["placement"], "bottom");
    }

    #[test]
    fn test_action_type_serializes_as_type() {
        let action = AvailableAction::new("start_order", "Start an order", json!({}));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "start_order");
        assert_eq!(value["title"], "Start an order");
    }

    #[test]
    fn test_message_only_response() {
        let response = AiResponse::message_only(Message::assistant("hello"));
        assert!(response.ui_components.is_empty());
        assert!(response.suggested_prompts.is_empty());
        assert_eq!(response.message.content, "hello");
    }
}
