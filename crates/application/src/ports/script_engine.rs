//! Script engine port

use async_trait::async_trait;

use relay_domain::{ScriptContext, ScriptExecutionResult, ScriptLanguage};

/// Errors raised while constructing an engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptEngineError {
    /// The engine runtime could not be started.
    #[error("failed to start {language} engine: {message}")]
    Startup {
        /// Engine language.
        language: ScriptLanguage,
        /// Underlying error text.
        message: String,
    },
}

/// Runs user scripts of one language against a `ScriptContext`.
///
/// Implementations own a long-lived runtime and give every call fresh
/// script state. A failure must carry the context exactly as it was passed
/// in; mutations are only ever returned inside a success.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    /// The language this engine runs.
    fn language(&self) -> ScriptLanguage;

    /// Runs `code` with `context` bound to [`relay_domain::CONTEXT_BINDING`].
    async fn run(&self, code: &str, context: ScriptContext) -> ScriptExecutionResult;
}
