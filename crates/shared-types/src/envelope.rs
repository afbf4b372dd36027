//! # `ErrorEnvelope`
//!
//! Serializable error record that crosses execution-context boundaries.
//!
//! A typed error never travels as-is: the sending side flattens it into
//! `{kind, code, message, details}` and the receiving side rebuilds a typed
//! error from the envelope's `kind`.

use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The wire form of a failed consent request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Taxonomy kind. Receivers dispatch on this, never on `message`.
    pub kind: ErrorKind,
    /// Numeric code derived from `kind`.
    pub code: i32,
    /// Human readable description.
    pub message: String,
    /// Optional structured context (e.g. the request id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}
