//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port using the reqwest
//! library. One client is created per process and shared by every
//! execution so connections are pooled.

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use relay_application::message::is_content_header;
use relay_application::ports::{HttpTransport, OutboundRequest, TransportError, TransportResponse};
use relay_domain::ExecutorSettings;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};

/// HTTP transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Creates a transport configured from executor settings.
    ///
    /// The User-Agent is not set on the client; the executor attaches it to
    /// every message so a request header can replace it.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(settings: &ExecutorSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            timeout_ms: settings.timeout_ms,
        })
    }

    /// Maps reqwest errors to transport errors.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }

        let message = error_chain(error);
        let lower = message.to_lowercase();
        let host = || {
            error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string()
        };

        if error.is_connect() {
            if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
                return TransportError::DnsError {
                    host: host(),
                    message,
                };
            }
            if lower.contains("refused") {
                return TransportError::ConnectionRefused {
                    host: host(),
                    message,
                };
            }
            if lower.contains("certificate") || lower.contains("tls") {
                return TransportError::Tls(message);
            }
            return TransportError::ConnectionFailed(message);
        }

        if error.is_body() || error.is_decode() {
            return TransportError::Body(message);
        }

        TransportError::Other(message)
    }
}

/// Joins an error with its sources; reqwest keeps the useful part
/// (DNS, refused, TLS) in the source chain.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Splits response headers into protocol and content headers, joining
/// repeated values with `", "`.
fn split_headers(headers: &HeaderMap) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut protocol = Vec::new();
    let mut content = Vec::new();
    for name in headers.keys() {
        let value = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let target = if is_content_header(name.as_str()) {
            &mut content
        } else {
            &mut protocol
        };
        target.push((name.as_str().to_string(), value));
    }
    (protocol, content)
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        let client = self.client.clone();
        let timeout_ms = self.timeout_ms;

        async move {
            let method = Method::from_bytes(request.method.as_bytes())
                .map_err(|_| TransportError::InvalidMethod(request.method.clone()))?;
            let url = Url::parse(&request.url)
                .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;

            let mut builder = client.request(method, url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(content) = request.content {
                for (name, value) in &content.headers {
                    // reqwest computes the length from the body
                    if name.eq_ignore_ascii_case("content-length") {
                        continue;
                    }
                    builder = builder.header(name, value);
                }
                builder = builder.body(content.body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| Self::map_error(&e, timeout_ms))?;

            let status = response.status().as_u16();
            let (headers, content_headers) = split_headers(response.headers());
            let body = response
                .bytes()
                .await
                .map_err(|e| Self::map_error(&e, timeout_ms))?
                .to_vec();

            Ok(TransportResponse {
                status,
                headers,
                content_headers,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, SET_COOKIE};

    #[test]
    fn test_client_creation() {
        let transport = ReqwestTransport::new(&ExecutorSettings::default());
        assert!(transport.is_ok());
    }

    #[test]
    fn test_split_headers_joins_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        let (protocol, content) = split_headers(&headers);

        assert_eq!(protocol, vec![("set-cookie".to_string(), "a=1, b=2".to_string())]);
        assert_eq!(content, vec![("content-type".to_string(), "text/plain".to_string())]);
    }

    #[tokio::test]
    async fn test_invalid_method_is_rejected() {
        let transport = ReqwestTransport::new(&ExecutorSettings::default()).expect("client");
        let result = transport
            .send(OutboundRequest {
                method: "BAD METHOD".to_string(),
                url: "http://localhost".to_string(),
                headers: Vec::new(),
                content: None,
            })
            .await;
        assert!(matches!(result, Err(TransportError::InvalidMethod(_))));
    }
}
