//! JSON serialization helpers for deterministic output.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// JSON deserialization failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to deterministic JSON: 2-space indentation and a
/// trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Same as [`to_json_stable`] but returns bytes for direct file writing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    to_json_stable(value).map(String::into_bytes)
}

/// Deserializes JSON from a string.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    serde_json::from_str(json).map_err(SerializationError::Deserialize)
}

/// Deserializes JSON from bytes.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use relay_domain::{ApiResponse, ExecutorSettings, Request};

    #[test]
    fn test_stable_output_has_indent_and_trailing_newline() {
        let json = to_json_stable(&ExecutorSettings::default()).expect("serializable");
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\n  \"history_limit\": 100"));
    }

    #[test]
    fn test_header_keys_are_sorted() {
        let request = Request::get("https://x.test")
            .with_header("X-Zebra", "1")
            .with_header("Accept", "*/*");

        let json = to_json_stable(&request).expect("serializable");
        let accept = json.find("Accept").expect("accept");
        let zebra = json.find("X-Zebra").expect("zebra");
        assert!(accept < zebra);
    }

    #[test]
    fn test_response_survives_bytes_roundtrip() {
        let response = ApiResponse::new(200, Duration::from_millis(30))
            .with_body("ok")
            .with_size(2);
        let bytes = to_json_stable_bytes(&response).expect("serializable");
        let restored: ApiResponse = from_json_bytes(&bytes).expect("deserializable");
        assert_eq!(restored, response);
    }

    #[test]
    fn test_invalid_json_is_a_deserialize_error() {
        let result: Result<Request, _> = from_json(r#"{"url": }"#);
        assert!(matches!(result, Err(SerializationError::Deserialize(_))));
    }
}
