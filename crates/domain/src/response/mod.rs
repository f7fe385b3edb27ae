//! Response type
//!
//! `ApiResponse` is what an execution hands back to its caller. A status code
//! of 0 is reserved for synthetic responses that never reached (or never
//! received) a real HTTP response.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status code marking a synthetic response.
pub const SYNTHETIC_STATUS: u16 = 0;

/// Media type of synthetic response bodies.
pub const TEXT_PLAIN: &str = "text/plain";

/// The captured result of one execution.
///
/// Built once through the `with_*` constructors and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body_type: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(rename = "elapsed_ms", with = "duration_millis")]
    elapsed: Duration,
    #[serde(default)]
    size: u64,
}

impl ApiResponse {
    /// Starts a response with a status code and elapsed time.
    #[must_use]
    pub const fn new(status_code: u16, elapsed: Duration) -> Self {
        Self {
            status_code,
            body: None,
            body_type: None,
            headers: BTreeMap::new(),
            elapsed,
            size: 0,
        }
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the body media type.
    #[must_use]
    pub fn with_body_type(mut self, body_type: impl Into<String>) -> Self {
        self.body_type = Some(body_type.into());
        self
    }

    /// Sets the header map.
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the byte size.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// A synthetic response for a transport failure.
    #[must_use]
    pub fn network_error(elapsed: Duration, message: &str) -> Self {
        Self::new(SYNTHETIC_STATUS, elapsed)
            .with_body(format!("Network Error: {message}"))
            .with_body_type(TEXT_PLAIN)
    }

    /// A synthetic response for a failed pre-request script.
    #[must_use]
    pub fn pre_script_failure(message: &str) -> Self {
        Self::new(SYNTHETIC_STATUS, Duration::ZERO)
            .with_body(format!("Pre-request script failed: {message}"))
            .with_body_type(TEXT_PLAIN)
    }

    /// The numeric status code (0 for synthetic responses).
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The body text, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The body media type without parameters.
    #[must_use]
    pub fn body_type(&self) -> Option<&str> {
        self.body_type.as_deref()
    }

    /// All response headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Looks up a header ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Time spent producing this response.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Body size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// True when no HTTP response was received.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.status_code == SYNTHETIC_STATUS
    }

    /// True for 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }

    /// True for 4xx and 5xx. Synthetic responses are not HTTP errors.
    #[must_use]
    pub const fn is_http_error(&self) -> bool {
        self.status_code >= 400 && self.status_code < 600
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_network_error_is_synthetic() {
        let response = ApiResponse::network_error(Duration::from_millis(12), "connection refused");
        assert!(response.is_synthetic());
        assert_eq!(response.body(), Some("Network Error: connection refused"));
        assert_eq!(response.body_type(), Some(TEXT_PLAIN));
        assert_eq!(response.elapsed(), Duration::from_millis(12));
        assert!(!response.is_http_error());
    }

    #[test]
    fn test_pre_script_failure_has_zero_elapsed() {
        let response = ApiResponse::pre_script_failure("boom");
        assert_eq!(response.status_code(), 0);
        assert_eq!(response.elapsed(), Duration::ZERO);
        assert!(response.body().is_some_and(|b| b.contains("Pre-request script failed")));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Length".to_string(), "5".to_string());
        let response = ApiResponse::new(200, Duration::ZERO).with_headers(headers);
        assert_eq!(response.header("content-length"), Some("5"));
    }

    #[test]
    fn test_elapsed_serializes_as_millis() {
        let response = ApiResponse::new(404, Duration::from_millis(250)).with_size(3);
        let json = serde_json::to_value(&response).expect("serializable");
        assert_eq!(json["elapsed_ms"], 250);
        assert_eq!(json["status_code"], 404);

        let restored: ApiResponse = serde_json::from_value(json).expect("deserializable");
        assert_eq!(restored, response);
        assert!(restored.is_http_error());
    }
}
