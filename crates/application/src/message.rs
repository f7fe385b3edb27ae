//! Outbound message construction and response assembly
//!
//! Pure functions between the domain `Request`/`ApiResponse` and the wire
//! types of the [`HttpTransport`](crate::ports::HttpTransport) port.

use std::collections::BTreeMap;
use std::time::Duration;

use mime::Mime;
use relay_domain::{ApiResponse, CONTENT_TYPE, Request};
use url::Url;

use crate::ports::{OutboundContent, OutboundRequest, TransportError, TransportResponse};

/// Name of the default outbound header.
pub const USER_AGENT: &str = "User-Agent";

const CONTENT_HEADERS: [&str; 11] = [
    "allow",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-md5",
    "content-range",
    "content-type",
    "expires",
    "last-modified",
];

/// True for headers that describe the body rather than the message.
#[must_use]
pub fn is_content_header(name: &str) -> bool {
    CONTENT_HEADERS
        .iter()
        .any(|header| header.eq_ignore_ascii_case(name))
}

/// Merges `query` into the query string of `base`.
///
/// Parameters already in the URL are kept in place; a key present in both
/// (ignoring ASCII case) takes the new value at its first position, with
/// its other occurrences dropped, and new keys are appended.
///
/// # Errors
///
/// Returns [`TransportError::InvalidUrl`] when `base` is not an absolute URL.
pub fn build_url_with_query(
    base: &str,
    query: &BTreeMap<String, String>,
) -> Result<String, TransportError> {
    let mut url = Url::parse(base.trim())
        .map_err(|e| TransportError::InvalidUrl(format!("{base}: {e}")))?;
    if query.is_empty() {
        return Ok(url.into());
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    for (key, value) in query {
        let matches = |(existing, _): &(String, String)| existing.eq_ignore_ascii_case(key);
        match pairs.iter().position(matches) {
            Some(first) => {
                pairs[first].1.clone_from(value);
                let mut index = 0;
                pairs.retain(|pair| {
                    let keep = index <= first || !matches(pair);
                    index += 1;
                    keep
                });
            }
            None => pairs.push((key.clone(), value.clone())),
        }
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.into())
}

/// Builds the wire message for a fully resolved request.
///
/// # Errors
///
/// Returns [`TransportError::InvalidMethod`] for a method that is not an
/// HTTP token and [`TransportError::InvalidUrl`] for an unparsable URL.
pub fn build_outbound(request: &Request, user_agent: &str) -> Result<OutboundRequest, TransportError> {
    let method = normalize_method(&request.method)?;
    let url = build_url_with_query(&request.url, &request.query)?;

    let mut content = request.has_body().then(|| {
        OutboundContent::new(
            request.body.as_deref().unwrap_or_default(),
            request.effective_content_type(),
        )
    });
    let mut headers = vec![(USER_AGENT.to_string(), user_agent.to_string())];

    for (name, value) in &request.headers {
        if is_content_header(name) {
            match content.as_mut() {
                // already chosen by effective_content_type
                Some(_) if name.eq_ignore_ascii_case(CONTENT_TYPE) => {}
                Some(content) => content.set_header(name.clone(), value.clone()),
                None => tracing::debug!(header = %name, "dropping content header on request without body"),
            }
        } else if name.eq_ignore_ascii_case(USER_AGENT) {
            headers.retain(|(key, _)| !key.eq_ignore_ascii_case(USER_AGENT));
            headers.insert(0, (name.clone(), value.clone()));
        } else {
            headers.push((name.clone(), value.clone()));
        }
    }

    Ok(OutboundRequest {
        method,
        url,
        headers,
        content,
    })
}

/// Turns a transport response into the domain response.
///
/// Content headers overwrite protocol headers of the same name. The body
/// type is the media type of `Content-Type` without parameters; the size is
/// `Content-Length` when present, otherwise the body length.
#[must_use]
pub fn assemble_response(response: TransportResponse, elapsed: Duration) -> ApiResponse {
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers.into_iter().chain(response.content_headers) {
        headers.retain(|key: &String, _| !key.eq_ignore_ascii_case(&name));
        headers.insert(name, value);
    }

    let find = |wanted: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value.as_str())
    };
    let body_type = find("content-type").map(media_type);
    let size = find("content-length")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(response.body.len() as u64);

    let mut api = ApiResponse::new(response.status, elapsed)
        .with_body(String::from_utf8_lossy(&response.body))
        .with_size(size);
    if let Some(body_type) = body_type {
        api = api.with_body_type(body_type);
    }
    api.with_headers(headers)
}

fn media_type(content_type: &str) -> String {
    content_type.parse::<Mime>().map_or_else(
        |_| {
            content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        },
        |mime| mime.essence_str().to_string(),
    )
}

fn normalize_method(method: &str) -> Result<String, TransportError> {
    let method = method.trim();
    let is_token = !method.is_empty()
        && method
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
    if is_token {
        Ok(method.to_ascii_uppercase())
    } else {
        Err(TransportError::InvalidMethod(method.to_string()))
    }
}
