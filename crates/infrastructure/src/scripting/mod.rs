//! Script engines for pre-request and post-response scripts.
//!
//! Both engines exchange the script context as JSON: the context's
//! `ScriptView` goes in under `pm` and whatever the script left in `pm` is
//! read back and committed.

mod js_engine;
mod rhai_engine;

use std::sync::Arc;

use relay_application::ScriptEngines;
use relay_application::ports::ScriptEngineError;
use relay_domain::{ScriptContext, ScriptExecutionResult, ScriptSettings, ScriptView};
use serde_json::Value;

pub use js_engine::JavaScriptEngine;
pub use rhai_engine::RhaiEngine;

/// Maps of string values a script may write any scalar into.
const STRING_MAPS: [&str; 4] = ["headers", "query", "variables", "environment"];

/// Creates the registry with both engines.
///
/// # Errors
///
/// Returns an error if the JavaScript runtime cannot be started.
pub fn default_engines(settings: &ScriptSettings) -> Result<ScriptEngines, ScriptEngineError> {
    Ok(ScriptEngines::new()
        .with_engine(Arc::new(RhaiEngine::new(settings)))
        .with_engine(Arc::new(JavaScriptEngine::new(settings)?)))
}

/// Reads back the view a script left behind.
///
/// Numbers and booleans written into the string maps are stored as their
/// text; `null` removes the entry.
fn view_from_json(mut value: Value) -> Result<ScriptView, String> {
    if let Value::Object(view) = &mut value {
        for key in STRING_MAPS {
            if let Some(Value::Object(map)) = view.get_mut(key) {
                map.retain(|_, value| !value.is_null());
                for value in map.values_mut() {
                    if !value.is_string() {
                        *value = Value::String(value.to_string());
                    }
                }
            }
        }
    }
    serde_json::from_value(value)
        .map_err(|e| format!("invalid {}: {e}", relay_domain::CONTEXT_BINDING))
}

/// Commits a script's view into the context, or reports why it cannot.
fn finish(
    mut context: ScriptContext,
    view: Result<ScriptView, String>,
    return_value: Option<Value>,
) -> ScriptExecutionResult {
    match view {
        Ok(view) => {
            context.commit(view);
            ScriptExecutionResult::success(context, return_value)
        }
        Err(error) => ScriptExecutionResult::failure(context, error),
    }
}
