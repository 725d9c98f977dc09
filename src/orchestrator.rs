// SPDX-License-Identifier: AGPL-3.0-or-later

//! Function orchestrator
//!
//! Fans selected calls out concurrently and collects their results without
//! letting one failure touch its siblings. Also synthesizes a best-effort
//! interim sentence per function so the UI has something to show when full
//! grounding is skipped.

use futures::future::join_all;
use serde_json::Value;

use crate::functions::builtin::{
    FN_ITEM_DETAILS, FN_LOYALTY_POINTS, FN_MENU_RECOMMENDATIONS, FN_PRODUCT_RECOMMENDATIONS,
    FN_SEARCH_MENU, FN_USER_PREFERENCES,
};
use crate::functions::FunctionCallResult;
use crate::strategy::FunctionExecutionStrategy;

/// One function call ready to execute
#[derive(Debug, Clone)]
pub struct DetectedCall {
    /// Function name
    pub function_name: String,
    /// Arguments built by the strategy
    pub args: Value,
}

/// Outcome of one executed call
#[derive(Debug, Clone)]
pub struct ExecutedFunction {
    /// Function name the result came from
    pub function_name: String,
    /// The wrapped result, success or failure
    pub result: FunctionCallResult,
}

/// Execute all detected calls concurrently and independently.
///
/// Results come back in the input order regardless of completion order.
pub async fn execute_all(
    strategy: &dyn FunctionExecutionStrategy,
    calls: Vec<DetectedCall>,
) -> Vec<ExecutedFunction> {
    let futures = calls.into_iter().map(|call| async move {
        tracing::debug!(
            target: "cortado.orchestrator",
            function = %call.function_name,
            "executing function"
        );
        let result = strategy
            .execute_function(&call.function_name, call.args)
            .await;
        ExecutedFunction {
            function_name: call.function_name,
            result,
        }
    });

    join_all(futures).await
}

/// Best-effort natural-language sentence for one function result.
///
/// Used as an immediate reply when grounding is skipped; the grounded path
/// replaces it entirely.
pub fn interim_reply(executed: &ExecutedFunction) -> Option<String> {
    if !executed.result.success {
        return None;
    }
    let data = executed.result.data.as_ref()?;

    match executed.function_name.as_str() {
        FN_LOYALTY_POINTS => {
            let points = data.get("points").and_then(Value::as_u64)?;
            Some(format!(
                "You have accumulated {} loyalty points so far.",
                points
            ))
        }
        FN_MENU_RECOMMENDATIONS => {
            let names = item_names(data.get("items")?);
            if names.is_empty() {
                Some("I couldn't find anything on the menu for that right now.".to_string())
            } else {
                Some(format!("Right now I'd recommend: {}.", names.join(", ")))
            }
        }
        FN_PRODUCT_RECOMMENDATIONS => {
            let names = item_names(data.get("products")?);
            if names.is_empty() {
                None
            } else {
                Some(format!("To take home, have a look at: {}.", names.join(", ")))
            }
        }
        FN_SEARCH_MENU => {
            let names = item_names(data.get("results")?);
            if names.is_empty() {
                Some("I couldn't find anything matching that name.".to_string())
            } else {
                Some(format!("I found: {}.", names.join(", ")))
            }
        }
        FN_ITEM_DETAILS => {
            let item = data.get("item")?;
            let name = item.get("name").and_then(Value::as_str)?;
            let description = item.get("description").and_then(Value::as_str).unwrap_or("");
            Some(format!("{}: {}", name, description))
        }
        FN_USER_PREFERENCES => {
            let prefs = data
                .get("preferences")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            if prefs.is_empty() {
                Some("I don't have any stored preferences for you yet.".to_string())
            } else {
                Some(format!("Your stored preferences: {}.", prefs))
            }
        }
        _ => None,
    }
}

/// Combined interim reply across all executed functions
pub fn combined_interim_reply(executed: &[ExecutedFunction]) -> Option<String> {
    let sentences: Vec<String> = executed.iter().filter_map(interim_reply).collect();
    if sentences.is_empty() {
        None
    } else {
        Some(sentences.join(" "))
    }
}

fn item_names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
