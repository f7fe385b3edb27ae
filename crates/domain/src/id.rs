//! ID generation utilities.

use uuid::Uuid;

/// Generates a new random UUID v4 as a string.
///
/// Used for request and environment identifiers.
#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new UUID v7 as a string.
///
/// UUID v7 includes timestamp information and is sortable, which makes it
/// the identifier of choice for history entries.
#[must_use]
pub fn generate_id_v7() -> String {
    Uuid::now_v7().to_string()
}
