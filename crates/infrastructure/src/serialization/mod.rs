//! Deterministic JSON serialization for Relay's files.
//!
//! History and settings files are written with sorted keys (via `BTreeMap`
//! in domain types), 2-space indentation and a trailing newline, so they
//! diff cleanly.

mod json;

pub use json::{SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes};
