//! HTTP transport port
//!
//! The transport receives a fully built message and returns the raw
//! response with its body already read. Message headers and content headers
//! travel separately, mirroring the split most HTTP stacks make between
//! headers of the message and headers that describe its body.

use std::future::Future;

use thiserror::Error;

/// Errors produced while dispatching a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The method is not a valid HTTP token.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request timed out.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The host name could not be resolved.
    #[error("could not resolve host {host}: {message}")]
    DnsError {
        /// Target host.
        host: String,
        /// Underlying error text.
        message: String,
    },

    /// The remote end refused the connection.
    #[error("connection refused by {host}: {message}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Underlying error text.
        message: String,
    },

    /// The connection failed for another reason.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Body of an outbound message together with the headers describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundContent {
    /// Body text, sent as UTF-8.
    pub body: String,
    /// Content headers. Names are unique ignoring ASCII case.
    pub headers: Vec<(String, String)>,
}

impl OutboundContent {
    /// Creates content with its `Content-Type`.
    #[must_use]
    pub fn new(body: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            headers: vec![("Content-Type".to_string(), content_type.into())],
        }
    }

    /// Sets a content header, replacing one with the same name in any casing.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Looks up a content header ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Upper-case method.
    pub method: String,
    /// Absolute URL including the merged query string.
    pub url: String,
    /// Message headers in application order.
    pub headers: Vec<(String, String)>,
    /// Body and content headers, absent when the request has no body.
    pub content: Option<OutboundContent>,
}

impl OutboundRequest {
    /// Looks up a message header ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A received response with its body fully read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    /// Numeric status code.
    pub status: u16,
    /// Protocol headers, multi-values joined with `", "`.
    pub headers: Vec<(String, String)>,
    /// Content headers, multi-values joined with `", "`.
    pub content_headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

/// Port for sending HTTP messages.
///
/// Implementations are long-lived and shared by every execution; they must
/// pool connections instead of creating a client per call.
pub trait HttpTransport: Send + Sync {
    /// Sends the message and reads the full response body.
    ///
    /// # Errors
    ///
    /// Returns an error on DNS, connection, TLS, timeout or body read
    /// failures. HTTP error statuses are not errors.
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}
