//! Domain error types

use thiserror::Error;

/// Domain-level errors raised while parsing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The script language name is not recognized.
    #[error("unsupported script language: {0}")]
    UnsupportedScriptLanguage(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
