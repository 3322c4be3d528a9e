use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::error::CoreError;

/// How a failed fetch is treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// 4xx-shaped failure. Not transient, never retried.
    Client,
    /// Message mentions "validation" or "invalid". Never retried.
    Validation,
    /// Everything else: network failures, 5xx, timeouts.
    Transient,
}

/// Failure surfaced by a query producer.
///
/// Carries an optional HTTP-like `status` so the retry policy can tell
/// client errors from transient ones without knowing the producer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct FetchError {
    message: String,
    status: Option<u16>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Classify this error for retry purposes.
    ///
    /// The status check wins over the message check; the message match is
    /// case-sensitive on the literal substrings.
    pub fn class(&self) -> ErrorClass {
        if matches!(self.status, Some(400..=499)) {
            ErrorClass::Client
        } else if self.message.contains("validation") || self.message.contains("invalid") {
            ErrorClass::Validation
        } else {
            ErrorClass::Transient
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<CoreError> for FetchError {
    fn from(err: CoreError) -> Self {
        let status = err.status();
        Self::with_status(err.to_string(), status)
    }
}
