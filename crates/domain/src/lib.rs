//! Relay Domain - Core data model
//!
//! This crate defines the data exchanged by the request execution pipeline:
//! requests, responses, the script context shared with user scripts, and
//! history records. All types here are pure Rust with no I/O dependencies.

pub mod collection;
pub mod environment;
pub mod error;
pub mod history;
pub mod id;
pub mod request;
pub mod response;
pub mod scripting;
pub mod settings;

pub use collection::Collection;
pub use environment::Environment;
pub use error::{DomainError, DomainResult};
pub use history::{HistoryEntry, RequestHistory};
pub use id::{generate_id, generate_id_v7};
pub use request::{CONTENT_TYPE, DEFAULT_BODY_TYPE, Request};
pub use response::{ApiResponse, SYNTHETIC_STATUS, TEXT_PLAIN};
pub use scripting::{
    CONTEXT_BINDING, ResponseView, ScriptContext, ScriptExecutionResult, ScriptLanguage,
    ScriptView,
};
pub use settings::{ExecutorSettings, ScriptSettings};
