// ── Core error types ──
//
// Domain errors raised by the repository layer. Consumers of the query
// layer never see these directly: `From<CoreError> for FetchError` folds
// them into an HTTP-like status so the retry policy can classify them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    // ── Availability ─────────────────────────────────────────────────
    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP-like status code for this error, as a REST backend would report it.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Validation { .. } => 422,
            Self::Unavailable { .. } => 503,
            Self::Timeout { .. } => 504,
            Self::Internal(_) => 500,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn not_found(entity_type: &str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
