//! Variable resolution engine
//!
//! Resolves `{!name}` and `{$name}` tokens against a [`ScriptContext`]
//! according to a fixed precedence:
//!
//! 1. values already resolved in this context
//! 2. script variables
//! 3. environment variables
//! 4. standard variables
//!
//! Anything else becomes an `{UNRESOLVED:name}` placeholder. Every value is
//! memoized in the context, so a token resolves to the same text for the
//! whole execution.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Captures;
use relay_domain::{Request, ScriptContext};

use super::builtins::StandardVariables;
use super::parser::{VariableSyntax, parse_variables};

/// Returns the placeholder substituted for a name nothing resolves.
#[must_use]
pub fn unresolved_placeholder(name: &str) -> String {
    format!("{{UNRESOLVED:{name}}}")
}

/// The variable resolution engine.
///
/// Holds no per-execution state; all memoization lives in the context passed
/// to each call, so one resolver is shared by every execution.
#[derive(Debug, Clone)]
pub struct VariableResolver {
    standard: Arc<StandardVariables>,
}

impl VariableResolver {
    /// Creates a resolver backed by a standard variable provider.
    #[must_use]
    pub const fn new(standard: Arc<StandardVariables>) -> Self {
        Self { standard }
    }

    /// Replaces every token of `syntax` in `text`. Tokens of the other
    /// syntax are left untouched.
    pub fn resolve(&self, syntax: VariableSyntax, text: &str, context: &mut ScriptContext) -> String {
        syntax
            .pattern()
            .replace_all(text, |caps: &Captures<'_>| self.value_of(&caps[1], context))
            .into_owned()
    }

    /// Resolves `{!name}` tokens.
    pub fn resolve_immediate(&self, text: &str, context: &mut ScriptContext) -> String {
        self.resolve(VariableSyntax::Immediate, text, context)
    }

    /// Resolves `{$name}` tokens.
    pub fn resolve_deferred(&self, text: &str, context: &mut ScriptContext) -> String {
        self.resolve(VariableSyntax::Deferred, text, context)
    }

    /// Resolves every key and value of `map` into a new map.
    pub fn resolve_map(
        &self,
        syntax: VariableSyntax,
        map: &BTreeMap<String, String>,
        context: &mut ScriptContext,
    ) -> BTreeMap<String, String> {
        map.iter()
            .map(|(key, value)| {
                (
                    self.resolve(syntax, key, context),
                    self.resolve(syntax, value, context),
                )
            })
            .collect()
    }

    /// Returns a copy of `request` with URL, body, headers and query resolved.
    pub fn resolve_request(
        &self,
        syntax: VariableSyntax,
        request: &Request,
        context: &mut ScriptContext,
    ) -> Request {
        let mut resolved = request.clone();
        resolved.url = self.resolve(syntax, &request.url, context);
        resolved.body = request
            .body
            .as_deref()
            .map(|body| self.resolve(syntax, body, context));
        resolved.headers = self.resolve_map(syntax, &request.headers, context);
        resolved.query = self.resolve_map(syntax, &request.query, context);
        resolved
    }

    /// Names of `syntax` tokens in `text` that nothing would resolve.
    /// Does not touch the context's cache.
    #[must_use]
    pub fn find_unresolved(
        &self,
        syntax: VariableSyntax,
        text: &str,
        context: &ScriptContext,
    ) -> Vec<String> {
        parse_variables(syntax, text)
            .into_iter()
            .filter(|reference| {
                let key = reference.name.to_lowercase();
                context.cached(&key).is_none()
                    && lookup(context.variables(), &key).is_none()
                    && lookup(context.environment(), &key).is_none()
                    && !StandardVariables::is_standard(&key)
            })
            .map(|reference| reference.name)
            .collect()
    }

    /// Extracts all variable names of `syntax` without resolving them.
    #[must_use]
    pub fn extract_variable_names(syntax: VariableSyntax, text: &str) -> Vec<String> {
        super::parser::extract_variable_names(syntax, text)
    }

    fn value_of(&self, name: &str, context: &mut ScriptContext) -> String {
        let key = name.to_lowercase();
        if let Some(cached) = context.cached(&key) {
            return cached.to_string();
        }

        let value = lookup(context.variables(), &key)
            .or_else(|| lookup(context.environment(), &key))
            .map(str::to_string)
            .or_else(|| self.standard.generate(&key))
            .unwrap_or_else(|| unresolved_placeholder(name));

        context.cache(key, value).to_string()
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key)
        .or_else(|| {
            map.iter()
                .find(|(name, _)| name.to_lowercase() == key)
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::ports::Clock;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn resolver() -> VariableResolver {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).single().expect("valid date");
        VariableResolver::new(Arc::new(StandardVariables::seeded(Arc::new(FixedClock(at)), 9)))
    }

    fn context() -> ScriptContext {
        let mut environment = BTreeMap::new();
        environment.insert("Host".to_string(), "api.test".to_string());
        environment.insert("token".to_string(), "env-token".to_string());
        ScriptContext::new(environment)
    }

    #[test]
    fn test_text_without_tokens_is_unchanged() {
        let resolver = resolver();
        let mut ctx = context();
        for text in ["", "plain", "{host}", "{{host}}", "{! host}"] {
            assert_eq!(resolver.resolve_immediate(text, &mut ctx), text);
            assert_eq!(resolver.resolve_deferred(text, &mut ctx), text);
        }
        assert!(ctx.resolved_variables().is_empty());
    }

    #[test]
    fn test_syntaxes_do_not_touch_each_other() {
        let resolver = resolver();
        let mut ctx = context();
        let text = "https://{!host}/{$host}";
        let after_immediate = resolver.resolve_immediate(text, &mut ctx);
        assert_eq!(after_immediate, "https://api.test/{$host}");
        assert_eq!(resolver.resolve_deferred(&after_immediate, &mut ctx), "https://api.test/api.test");
    }

    #[test]
    fn test_environment_lookup_ignores_case() {
        let resolver = resolver();
        let mut ctx = context();
        assert_eq!(resolver.resolve_deferred("{$HOST}", &mut ctx), "api.test");
    }

    #[test]
    fn test_script_variables_shadow_environment() {
        let resolver = resolver();
        let mut ctx = context();
        ctx.set_variable("Token", "script-token");
        assert_eq!(resolver.resolve_immediate("{!token}", &mut ctx), "script-token");
    }

    #[test]
    fn test_standard_values_are_stable_within_a_context() {
        let resolver = resolver();
        let mut ctx = context();
        let first = resolver.resolve_immediate("{!guid}", &mut ctx);
        let again = resolver.resolve_deferred("{$GUID}", &mut ctx);
        assert_eq!(first, again);

        let mut other = context();
        assert_ne!(resolver.resolve_immediate("{!guid}", &mut other), first);
    }

    #[test]
    fn test_cached_value_wins_over_later_variables() {
        let resolver = resolver();
        let mut ctx = context();
        assert_eq!(resolver.resolve_immediate("{!token}", &mut ctx), "env-token");
        ctx.set_variable("token", "late");
        assert_eq!(resolver.resolve_deferred("{$token}", &mut ctx), "env-token");
    }

    #[test]
    fn test_unknown_names_keep_their_spelling() {
        let resolver = resolver();
        let mut ctx = context();
        assert_eq!(resolver.resolve_immediate("{!Nope}", &mut ctx), "{UNRESOLVED:Nope}");
        assert_eq!(resolver.resolve_immediate("{!nope}", &mut ctx), "{UNRESOLVED:Nope}");
        assert_eq!(ctx.cached("nope"), Some("{UNRESOLVED:Nope}"));
    }

    #[test]
    fn test_map_resolution_leaves_input_alone() {
        let resolver = resolver();
        let mut ctx = context();
        let mut headers = BTreeMap::new();
        headers.insert("X-{!token}".to_string(), "Bearer {!token}".to_string());
        let original = headers.clone();

        let resolved = resolver.resolve_map(VariableSyntax::Immediate, &headers, &mut ctx);

        assert_eq!(headers, original);
        assert_eq!(
            resolved.get("X-env-token").map(String::as_str),
            Some("Bearer env-token")
        );
    }

    #[test]
    fn test_resolve_request_covers_every_field() {
        let resolver = resolver();
        let mut ctx = context();
        let request = Request::post("https://{$host}/users")
            .with_body(r#"{"t":"{$token}"}"#, "application/json")
            .with_header("Authorization", "Bearer {$token}")
            .with_query("ts", "{$timestamp}");

        let resolved = resolver.resolve_request(VariableSyntax::Deferred, &request, &mut ctx);

        assert_eq!(resolved.url, "https://api.test/users");
        assert_eq!(resolved.body.as_deref(), Some(r#"{"t":"env-token"}"#));
        assert_eq!(resolved.header("authorization"), Some("Bearer env-token"));
        assert_eq!(resolved.query.get("ts").map(String::as_str), Some("1709281800000"));
        assert_eq!(resolved.id, request.id);
    }

    #[test]
    fn test_find_unresolved_reports_without_caching() {
        let resolver = resolver();
        let ctx = context();
        let missing =
            resolver.find_unresolved(VariableSyntax::Deferred, "{$host}/{$missing}/{$uuid}", &ctx);
        assert_eq!(missing, vec!["missing".to_string()]);
        assert!(ctx.resolved_variables().is_empty());
        assert_eq!(
            VariableResolver::extract_variable_names(VariableSyntax::Immediate, "{!a}{$b}{!c}"),
            vec!["a".to_string(), "c".to_string()]
        );
    }
}
