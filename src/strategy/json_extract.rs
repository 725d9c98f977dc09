// SPDX-License-Identifier: AGPL-3.0-or-later

//! Best-effort JSON extraction from model prose
//!
//! Models asked for "a JSON array" routinely wrap it in commentary or code
//! fences. These helpers find the first balanced bracket span and try to
//! parse it. This is inherently best-effort, not a guaranteed contract;
//! callers must handle `None`.

use serde_json::Value;

/// Extract the first JSON array from free text
pub fn extract_array(text: &str) -> Option<Value> {
    extract_balanced(text, '[', ']')
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .filter(Value::is_array)
}

/// Extract the first JSON object from free text
pub fn extract_object(text: &str) -> Option<Value> {
    extract_balanced(text, '{', '}')
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .filter(Value::is_object)
}

/// Find the first balanced `open`..`close` span, respecting strings.
fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_array() {
        let value = extract_array(r#"["get_loyalty_points", "get_item_details"]"#).unwrap();
        assert_eq!(value, json!(["get_loyalty_points", "get_item_details"]));
    }

    #[test]
    fn test_array_wrapped_in_commentary() {
        let text = "Sure! Based on the message, I'd call:\n```json\n[\"get_menu_recommendations\"]\n```\nLet me know.";
        let value = extract_array(text).unwrap();
        assert_eq!(value, json!(["get_menu_recommendations"]));
    }

    #[test]
    fn test_no_json_at_all() {
        assert!(extract_array("I don't think any functions apply here.").is_none());
        assert!(extract_object("no braces either").is_none());
    }

    #[test]
    fn test_object_wrapped_in_commentary() {
        let text = r#"Here are the arguments: {"timeOfDay": "morning", "category": "all"} and that should do it."#;
        let value = extract_object(text).unwrap();
        assert_eq!(value["timeOfDay"], "morning");
    }

    #[test]
    fn test_nested_object() {
        let text = r#"{"filter": {"category": "coffee"}, "limit": 3}"#;
        let value = extract_object(text).unwrap();
        assert_eq!(value["filter"]["category"], "coffee");
    }

    #[test]
    fn test_brackets_inside_strings_do_not_confuse() {
        let text = r#"{"note": "use [brackets] and {braces} freely"}"#;
        let value = extract_object(text).unwrap();
        assert_eq!(value["note"], "use [brackets] and {braces} freely");
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert!(extract_object(r#"{"broken": "#).is_none());
        assert!(extract_array(r#"["a", "b""#).is_none());
    }

    #[test]
    fn test_malformed_json_in_balanced_span() {
        assert!(extract_object("{not json}").is_none());
    }
}
