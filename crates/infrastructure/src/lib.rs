//! Relay Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the reqwest transport, the Rhai and
//! QuickJS script engines, history and settings persistence, and the
//! system clock.

pub mod adapters;
pub mod persistence;
pub mod scripting;
pub mod serialization;

pub use adapters::{ReqwestTransport, SystemClock};
pub use persistence::{
    FileHistoryRepository, InMemoryHistoryRepository, SettingsError, SettingsRepository,
};
pub use scripting::{JavaScriptEngine, RhaiEngine, default_engines};
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
