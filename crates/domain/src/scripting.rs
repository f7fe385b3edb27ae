//! Pre-request and post-response scripting.
//!
//! A `ScriptContext` is the state one execution shares with user scripts.
//! Scripts never touch it directly: engines hand them a `ScriptView`, an
//! owned copy of the fields scripts may read or write, and the executor
//! writes the view back with [`ScriptContext::commit`] only after a script
//! finished successfully.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::request::Request;
use crate::response::ApiResponse;

/// Identifier the script context is bound to inside every script.
pub const CONTEXT_BINDING: &str = "pm";

/// Script language selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptLanguage {
    /// Rhai, an embedded Rust scripting language.
    Rhai,
    /// JavaScript (ES2020) on QuickJS.
    #[serde(rename = "javascript", alias = "js")]
    JavaScript,
}

impl ScriptLanguage {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rhai => "rhai",
            Self::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptLanguage {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rhai" => Ok(Self::Rhai),
            "javascript" | "js" => Ok(Self::JavaScript),
            other => Err(DomainError::UnsupportedScriptLanguage(other.to_string())),
        }
    }
}

/// Per-execution state shared between the executor and scripts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptContext {
    environment: BTreeMap<String, String>,
    variables: BTreeMap<String, String>,
    resolved: HashMap<String, String>,
    request: Option<Request>,
    response: Option<ApiResponse>,
}

impl ScriptContext {
    /// Creates a context over an environment.
    #[must_use]
    pub fn new(environment: BTreeMap<String, String>) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Seeds the script-settable variables.
    #[must_use]
    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Attaches the in-flight request.
    #[must_use]
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Environment variables. Read-only for the lifetime of the context.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Variables set by scripts.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Sets a script variable.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns the memoized value for a lowercase variable key.
    #[must_use]
    pub fn cached(&self, key: &str) -> Option<&str> {
        self.resolved.get(key).map(String::as_str)
    }

    /// Memoizes a value under a lowercase key and returns the value now
    /// stored. A key that is already populated keeps its first value.
    pub fn cache(&mut self, key: String, value: String) -> &str {
        self.resolved.entry(key).or_insert(value)
    }

    /// Every value memoized so far.
    #[must_use]
    pub const fn resolved_variables(&self) -> &HashMap<String, String> {
        &self.resolved
    }

    /// The in-flight request.
    #[must_use]
    pub const fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Replaces the in-flight request.
    pub fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    /// The captured response, present after dispatch.
    #[must_use]
    pub const fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    /// Attaches the captured response.
    pub fn set_response(&mut self, response: ApiResponse) {
        self.response = Some(response);
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.url.as_str())
    }

    /// Sets the request URL in place.
    pub fn set_url(&mut self, url: impl Into<String>) {
        if let Some(request) = self.request.as_mut() {
            request.url = url.into();
        }
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.method.as_str())
    }

    /// Sets the request method in place.
    pub fn set_method(&mut self, method: impl Into<String>) {
        if let Some(request) = self.request.as_mut() {
            request.method = method.into();
        }
    }

    /// Request body.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.body.as_deref())
    }

    /// Sets the request body in place.
    pub fn set_body(&mut self, body: impl Into<String>) {
        if let Some(request) = self.request.as_mut() {
            request.body = Some(body.into());
        }
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        self.request.as_ref().map(|r| &r.headers)
    }

    /// Request query parameters.
    #[must_use]
    pub fn query(&self) -> Option<&BTreeMap<String, String>> {
        self.request.as_ref().map(|r| &r.query)
    }

    /// Response status code.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(ApiResponse::status_code)
    }

    /// Response body.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        self.response.as_ref().and_then(ApiResponse::body)
    }

    /// Response timing.
    #[must_use]
    pub fn response_time(&self) -> Option<Duration> {
        self.response.as_ref().map(ApiResponse::elapsed)
    }

    /// Response size in bytes.
    #[must_use]
    pub fn response_size(&self) -> Option<u64> {
        self.response.as_ref().map(ApiResponse::size)
    }

    /// Builds the owned view handed to a script.
    #[must_use]
    pub fn to_view(&self) -> ScriptView {
        let request = self.request.as_ref();
        ScriptView {
            method: request.map(|r| r.method.clone()).unwrap_or_default(),
            url: request.map(|r| r.url.clone()).unwrap_or_default(),
            body: request.and_then(|r| r.body.clone()),
            body_type: request.and_then(|r| r.body_type.clone()),
            headers: request.map(|r| r.headers.clone()).unwrap_or_default(),
            query: request.map(|r| r.query.clone()).unwrap_or_default(),
            variables: self.variables.clone(),
            environment: self.environment.clone(),
            response: self.response.as_ref().map(ResponseView::from),
        }
    }

    /// Writes a view produced by a successful script back into the context.
    ///
    /// Request fields and variables are taken from the view. Environment and
    /// response edits are discarded; both are read-only to scripts.
    pub fn commit(&mut self, view: ScriptView) {
        if let Some(request) = self.request.as_mut() {
            request.method = view.method;
            request.url = view.url;
            request.body = view.body;
            request.body_type = view.body_type;
            request.headers = view.headers;
            request.query = view.query;
        }
        self.variables = view.variables;
    }
}

/// The owned copy of a `ScriptContext` that scripts operate on.
///
/// Serialized into each engine's native value model under
/// [`CONTEXT_BINDING`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptView {
    /// Request method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request body.
    pub body: Option<String>,
    /// Request body media type.
    pub body_type: Option<String>,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Request query parameters.
    pub query: BTreeMap<String, String>,
    /// Script variables.
    pub variables: BTreeMap<String, String>,
    /// Environment variables (writes are discarded).
    pub environment: BTreeMap<String, String>,
    /// Response fields, absent before dispatch.
    pub response: Option<ResponseView>,
}

/// Response fields visible to post-response scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseView {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: Option<String>,
    /// Body media type.
    pub body_type: Option<String>,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Size in bytes.
    pub size: u64,
}

impl From<&ApiResponse> for ResponseView {
    #[allow(clippy::cast_possible_truncation)]
    fn from(response: &ApiResponse) -> Self {
        Self {
            status: response.status_code(),
            body: response.body().map(str::to_string),
            body_type: response.body_type().map(str::to_string),
            headers: response.headers().clone(),
            elapsed_ms: response.elapsed().as_millis() as u64,
            size: response.size(),
        }
    }
}

/// Outcome of running one script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptExecutionResult {
    /// The script completed.
    Success {
        /// The context with the script's mutations committed.
        context: ScriptContext,
        /// The script's final expression value, if it produced one.
        return_value: Option<serde_json::Value>,
    },
    /// The script failed to compile or raised an error.
    Failure {
        /// The context exactly as it was handed to the engine.
        context: ScriptContext,
        /// Human-readable error text.
        error: String,
    },
}

impl ScriptExecutionResult {
    /// Creates a success result.
    #[must_use]
    pub const fn success(context: ScriptContext, return_value: Option<serde_json::Value>) -> Self {
        Self::Success {
            context,
            return_value,
        }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(context: ScriptContext, error: impl Into<String>) -> Self {
        Self::Failure {
            context,
            error: error.into(),
        }
    }

    /// True for `Success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The carried context.
    #[must_use]
    pub const fn context(&self) -> &ScriptContext {
        match self {
            Self::Success { context, .. } | Self::Failure { context, .. } => context,
        }
    }

    /// Consumes the result, returning the carried context.
    #[must_use]
    pub fn into_context(self) -> ScriptContext {
        match self {
            Self::Success { context, .. } | Self::Failure { context, .. } => context,
        }
    }

    /// The error text of a failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// The return value of a success.
    #[must_use]
    pub const fn return_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { return_value, .. } => return_value.as_ref(),
            Self::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> ScriptContext {
        let mut environment = BTreeMap::new();
        environment.insert("host".to_string(), "api.test".to_string());
        ScriptContext::new(environment).with_request(
            Request::post("https://api.test/users")
                .with_header("Accept", "application/json")
                .with_body("{}", "application/json"),
        )
    }

    #[test]
    fn test_language_parses_aliases() {
        assert_eq!("JS".parse::<ScriptLanguage>(), Ok(ScriptLanguage::JavaScript));
        assert_eq!("rhai".parse::<ScriptLanguage>(), Ok(ScriptLanguage::Rhai));
        assert!("python".parse::<ScriptLanguage>().is_err());
        assert_eq!(
            serde_json::to_string(&ScriptLanguage::JavaScript).ok(),
            Some("\"javascript\"".to_string())
        );
    }

    #[test]
    fn test_cache_is_write_once() {
        let mut ctx = context();
        assert_eq!(ctx.cache("guid".into(), "first".into()), "first");
        assert_eq!(ctx.cache("guid".into(), "second".into()), "first");
        assert_eq!(ctx.cached("guid"), Some("first"));
    }

    #[test]
    fn test_accessors_mutate_the_request() {
        let mut ctx = context();
        ctx.set_url("https://api.test/v2/users");
        ctx.set_method("PUT");
        assert_eq!(ctx.request().map(|r| r.url.as_str()), Some("https://api.test/v2/users"));
        assert_eq!(ctx.method(), Some("PUT"));
        assert_eq!(ctx.status_code(), None);
    }

    #[test]
    fn test_commit_applies_request_and_variables_only() {
        let mut ctx = context();
        let mut view = ctx.to_view();
        view.url = "https://api.test/other".into();
        view.headers.insert("X-Trace".into(), "1".into());
        view.variables.insert("token".into(), "abc".into());
        view.environment.insert("host".into(), "evil.test".into());

        ctx.commit(view);

        assert_eq!(ctx.url(), Some("https://api.test/other"));
        assert_eq!(ctx.headers().and_then(|h| h.get("X-Trace")).map(String::as_str), Some("1"));
        assert_eq!(ctx.variables().get("token").map(String::as_str), Some("abc"));
        assert_eq!(ctx.environment().get("host").map(String::as_str), Some("api.test"));
    }

    #[test]
    fn test_view_exposes_response_after_dispatch() {
        let mut ctx = context();
        assert!(ctx.to_view().response.is_none());

        ctx.set_response(
            ApiResponse::new(201, Duration::from_millis(40))
                .with_body("ok")
                .with_size(2),
        );
        let view = ctx.to_view();
        let response = view.response.expect("response view");
        assert_eq!(response.status, 201);
        assert_eq!(response.elapsed_ms, 40);
        assert_eq!(response.body.as_deref(), Some("ok"));
    }

    #[test]
    fn test_view_deserializes_partial_objects() {
        let view: ScriptView =
            serde_json::from_str(r#"{"url": "https://x.test", "response": null}"#).expect("view");
        assert_eq!(view.url, "https://x.test");
        assert!(view.headers.is_empty());
    }

    #[test]
    fn test_failure_result_carries_original_context() {
        let ctx = context();
        let result = ScriptExecutionResult::failure(ctx.clone(), "boom");
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("boom"));
        assert!(result.return_value().is_none());
        assert_eq!(result.into_context(), ctx);
    }
}
