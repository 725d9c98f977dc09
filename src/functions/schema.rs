// SPDX-License-Identifier: AGPL-3.0-or-later

//! Builder for function parameter schemas

use serde_json::{json, Map, Value};

use crate::functions::FunctionParameters;

/// Incremental builder for JSON object schemas.
///
/// Covers the shapes the built-in functions need; anything fancier can be
/// written as a raw `FunctionParameters`.
pub struct SchemaBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Start an empty object schema
    pub fn new() -> Self {
        Self {
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a string parameter
    pub fn string(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": "string", "description": description}),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string parameter restricted to the given values
    pub fn string_enum(
        mut self,
        name: &str,
        description: &str,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": "string", "description": description, "enum": values}),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add an integer parameter
    pub fn integer(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": "integer", "description": description}),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a boolean parameter
    pub fn boolean(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": "boolean", "description": description}),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add an array-of-strings parameter
    pub fn string_array(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({
                "type": "array",
                "description": description,
                "items": {"type": "string"}
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Finish the schema
    pub fn build(self) -> FunctionParameters {
        FunctionParameters {
            schema_type: "object".to_string(),
            properties: Value::Object(self.properties),
            required: self.required,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_required() {
        let params = SchemaBuilder::new()
            .string("itemId", "Item identifier", true)
            .string("note", "Optional note", false)
            .build();

        assert_eq!(params.schema_type, "object");
        assert_eq!(params.required, vec!["itemId"]);
        assert_eq!(params.property("itemId").unwrap()["type"], "string");
        assert!(params.property("missing").is_none());
    }

    #[test]
    fn test_enum_values() {
        let params = SchemaBuilder::new()
            .string_enum("category", "Menu category", &["all", "coffee", "tea"], false)
            .build();

        let values = params.property("category").unwrap()["enum"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], "all");
    }

    #[test]
    fn test_mixed_types() {
        let params = SchemaBuilder::new()
            .integer("count", "How many", false)
            .boolean("includeSeasonal", "Include seasonal items", false)
            .string_array("tags", "Filter tags", false)
            .build();

        assert_eq!(params.property("count").unwrap()["type"], "integer");
        assert_eq!(params.property("includeSeasonal").unwrap()["type"], "boolean");
        assert_eq!(params.property("tags").unwrap()["items"]["type"], "string");
        assert!(params.required.is_empty());
    }
}
