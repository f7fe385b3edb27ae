//! Request definition
//!
//! A `Request` is the stored, user-editable description of an HTTP call.
//! Execution always works on a value snapshot of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scripting::ScriptLanguage;

/// Canonical spelling of the content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Body media type used when a request carries a body but no type.
pub const DEFAULT_BODY_TYPE: &str = "application/json";

/// An HTTP request definition with optional scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier.
    #[serde(default = "crate::generate_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning collection, if the request is stored in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    /// HTTP method as written by the user (normalized at dispatch).
    #[serde(default = "default_method")]
    pub method: String,
    /// Target URL, possibly containing variable tokens.
    pub url: String,
    /// Raw body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Media type of the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    /// Headers. Keys keep their casing on the wire.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Query parameters merged into the URL at dispatch.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Script run before the request is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,
    /// Script run after the response is received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_response_script: Option<String>,
    /// Language both scripts are written in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_language: Option<ScriptLanguage>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Request {
    /// Creates a request with the given method and URL.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: crate::generate_id(),
            name: String::new(),
            collection_id: None,
            method: method.into(),
            url: url.into(),
            body: None,
            body_type: None,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            pre_request_script: None,
            post_response_script: None,
            script_language: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a header, replacing any header with the same name in any casing.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Sets the body and its media type.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>, body_type: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_type = Some(body_type.into());
        self
    }

    /// Sets the pre-request script and the script language.
    #[must_use]
    pub fn with_pre_request_script(
        mut self,
        language: ScriptLanguage,
        script: impl Into<String>,
    ) -> Self {
        self.script_language = Some(language);
        self.pre_request_script = Some(script.into());
        self
    }

    /// Sets the post-response script and the script language.
    #[must_use]
    pub fn with_post_response_script(
        mut self,
        language: ScriptLanguage,
        script: impl Into<String>,
    ) -> Self {
        self.script_language = Some(language);
        self.post_response_script = Some(script.into());
        self
    }

    /// Looks up a header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a header, removing every existing header with the same name in
    /// any casing first.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_header(&name);
        self.headers.insert(name, value.into());
    }

    /// Removes every header matching `name` ignoring ASCII case.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    }

    /// Returns true if the request carries a non-empty body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|body| !body.is_empty())
    }

    /// The content type sent with the body: an explicit `Content-Type`
    /// header wins over `body_type`, which falls back to JSON.
    #[must_use]
    pub fn effective_content_type(&self) -> &str {
        self.header(CONTENT_TYPE)
            .or(self.body_type.as_deref())
            .unwrap_or(DEFAULT_BODY_TYPE)
    }

    /// The pre-request script, if both code and a language are configured.
    #[must_use]
    pub fn pre_request(&self) -> Option<(ScriptLanguage, &str)> {
        Self::script(self.script_language, self.pre_request_script.as_deref())
    }

    /// The post-response script, if both code and a language are configured.
    #[must_use]
    pub fn post_response(&self) -> Option<(ScriptLanguage, &str)> {
        Self::script(self.script_language, self.post_response_script.as_deref())
    }

    fn script(language: Option<ScriptLanguage>, code: Option<&str>) -> Option<(ScriptLanguage, &str)> {
        match (language, code) {
            (Some(language), Some(code)) if !code.trim().is_empty() => Some((language, code)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = Request::get("https://x.test").with_header("Authorization", "Bearer t");
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer t"));
    }

    #[test]
    fn test_set_header_replaces_other_casing() {
        let mut request = Request::get("https://x.test").with_header("Content-Type", "text/plain");
        request.set_header("content-type", "application/xml");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers.get("content-type").map(String::as_str), Some("application/xml"));
    }

    #[test]
    fn test_effective_content_type_prefers_header() {
        let request = Request::post("https://x.test")
            .with_body("<a/>", "text/plain")
            .with_header("content-type", "application/xml");
        assert_eq!(request.effective_content_type(), "application/xml");

        let request = Request::post("https://x.test").with_body("{}", "text/plain");
        assert_eq!(request.effective_content_type(), "text/plain");

        let mut request = Request::post("https://x.test");
        request.body = Some("{}".into());
        assert_eq!(request.effective_content_type(), DEFAULT_BODY_TYPE);
    }

    #[test]
    fn test_scripts_require_language_and_content() {
        let mut request = Request::get("https://x.test");
        request.pre_request_script = Some("pm.url = \"x\";".into());
        assert!(request.pre_request().is_none());

        request.script_language = Some(ScriptLanguage::Rhai);
        assert!(request.pre_request().is_some());

        request.pre_request_script = Some("   ".into());
        assert!(request.pre_request().is_none());
        assert!(request.post_response().is_none());
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let request: Request =
            serde_json::from_str(r#"{"url": "https://x.test/a"}"#).expect("valid request");
        assert_eq!(request.method, "GET");
        assert!(request.headers.is_empty());
        assert!(!request.has_body());
        assert_eq!(request.id.len(), 36);
    }
}
