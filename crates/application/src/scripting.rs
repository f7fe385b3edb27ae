//! Script engine registry

use std::collections::HashMap;
use std::sync::Arc;

use relay_domain::{ScriptContext, ScriptExecutionResult, ScriptLanguage};

use crate::ports::ScriptEngine;

/// Engines keyed by the language they run.
#[derive(Clone, Default)]
pub struct ScriptEngines {
    engines: HashMap<ScriptLanguage, Arc<dyn ScriptEngine>>,
}

impl ScriptEngines {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an engine under its own language, replacing any previous one.
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.register(engine);
        self
    }

    /// Registers an engine under its own language, replacing any previous one.
    pub fn register(&mut self, engine: Arc<dyn ScriptEngine>) {
        self.engines.insert(engine.language(), engine);
    }

    /// The engine for `language`.
    #[must_use]
    pub fn get(&self, language: ScriptLanguage) -> Option<&Arc<dyn ScriptEngine>> {
        self.engines.get(&language)
    }

    /// Registered languages.
    #[must_use]
    pub fn languages(&self) -> Vec<ScriptLanguage> {
        let mut languages: Vec<_> = self.engines.keys().copied().collect();
        languages.sort_by_key(|language| language.as_str());
        languages
    }

    /// Runs `code` on the engine for `language`.
    ///
    /// A language without a registered engine yields a failure carrying the
    /// untouched context.
    pub async fn run(
        &self,
        language: ScriptLanguage,
        code: &str,
        context: ScriptContext,
    ) -> ScriptExecutionResult {
        match self.engines.get(&language) {
            Some(engine) => engine.run(code, context).await,
            None => ScriptExecutionResult::failure(
                context,
                format!("Unsupported script language: {language}"),
            ),
        }
    }
}

impl std::fmt::Debug for ScriptEngines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngines")
            .field("languages", &self.languages())
            .finish()
    }
}
