//! Application error types

use thiserror::Error;

use crate::ports::{HistoryError, ScriptEngineError, TransportError};

/// Application-level errors.
///
/// The executor itself never returns these for user-triggerable failures;
/// they surface from wiring and from direct use of the ports.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A script engine could not be created.
    #[error("script engine error: {0}")]
    ScriptEngine(#[from] ScriptEngineError),

    /// A history operation failed.
    #[error("history error: {0}")]
    History(#[from] HistoryError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
