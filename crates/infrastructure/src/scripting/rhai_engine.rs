//! Rhai script engine.
//!
//! One `Engine` serves every call; each run gets a fresh `Scope` holding
//! only `pm`. Runs happen on the blocking pool since evaluation is CPU-bound.

use std::sync::Arc;

use async_trait::async_trait;
use relay_application::ports::ScriptEngine;
use relay_domain::{CONTEXT_BINDING, ScriptContext, ScriptExecutionResult, ScriptLanguage, ScriptSettings};
use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;

use super::{finish, view_from_json};

/// Runs Rhai scripts.
#[derive(Clone)]
pub struct RhaiEngine {
    engine: Arc<Engine>,
}

impl RhaiEngine {
    /// Creates an engine with the operation budget from `settings`.
    #[must_use]
    pub fn new(settings: &ScriptSettings) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(settings.max_operations);
        engine.on_print(|text| tracing::info!(target: "relay::script", "{text}"));
        engine.on_debug(|text, _source, position| {
            tracing::debug!(target: "relay::script", %position, "{text}");
        });
        Self {
            engine: Arc::new(engine),
        }
    }

    fn run_blocking(engine: &Engine, code: &str, context: ScriptContext) -> ScriptExecutionResult {
        let pm = match rhai::serde::to_dynamic(context.to_view()) {
            Ok(pm) => pm,
            Err(error) => return ScriptExecutionResult::failure(context, error.to_string()),
        };

        let mut scope = Scope::new();
        scope.push_dynamic(CONTEXT_BINDING, pm);

        let output = match engine.eval_with_scope::<Dynamic>(&mut scope, code) {
            Ok(output) => output,
            Err(error) => return ScriptExecutionResult::failure(context, error.to_string()),
        };

        let return_value = if output.is_unit() {
            None
        } else {
            rhai::serde::from_dynamic::<Value>(&output).ok()
        };
        let view = scope
            .get_value::<Dynamic>(CONTEXT_BINDING)
            .ok_or_else(|| format!("{CONTEXT_BINDING} was removed"))
            .and_then(|pm| rhai::serde::from_dynamic::<Value>(&pm).map_err(|e| e.to_string()))
            .and_then(view_from_json);

        finish(context, view, return_value)
    }
}

impl std::fmt::Debug for RhaiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiEngine").finish_non_exhaustive()
    }
}

#[async_trait]
impl ScriptEngine for RhaiEngine {
    fn language(&self) -> ScriptLanguage {
        ScriptLanguage::Rhai
    }

    async fn run(&self, code: &str, context: ScriptContext) -> ScriptExecutionResult {
        let engine = Arc::clone(&self.engine);
        let code = code.to_string();
        let original = context.clone();

        match tokio::task::spawn_blocking(move || Self::run_blocking(&engine, &code, context)).await {
            Ok(result) => result,
            Err(error) => ScriptExecutionResult::failure(original, format!("script task failed: {error}")),
        }
    }
}
