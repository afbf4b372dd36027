//! Consent error types.
//!
//! `ConsentError` is the typed error inside the process. At a context
//! boundary it is flattened into an `ErrorEnvelope` and rebuilt on the other
//! side with `ConsentError::from_envelope`.

use super::entities::RequestId;
use shared_types::{ErrorEnvelope, ErrorKind};
use thiserror::Error;

/// Consent subsystem errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentError {
    /// Account cannot sign, or no approved account context exists.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Denied by the approver, cleared in bulk, or unlock dismissed.
    #[error("User rejected the request")]
    UserRejected,

    /// Semantically invalid payload.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown request type or method.
    #[error("Method not supported: {0}")]
    MethodNotSupported(String),

    /// Signing or broadcast collaborator failed.
    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    /// No live request with this id (never issued, or already settled).
    #[error("Request {0} not found")]
    NotFound(RequestId),

    /// The durable queue could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The consent service is no longer running.
    #[error("Consent service unavailable")]
    ServiceUnavailable,

    /// Internal error reconstructed from a remote envelope.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for consent operations.
pub type ConsentResult<T> = Result<T, ConsentError>;

impl ConsentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::UserRejected => ErrorKind::UserRejected,
            Self::InvalidRequest(_) | Self::NotFound(_) => ErrorKind::InvalidRequest,
            Self::MethodNotSupported(_) => ErrorKind::MethodNotSupported,
            Self::ProviderFailure(_) => ErrorKind::ProviderFailure,
            Self::Storage(_) | Self::ServiceUnavailable | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.kind().is_user_rejection()
    }

    /// Flatten into the wire envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.kind(), self.to_string());
        match self {
            Self::NotFound(id) => envelope.with_details(serde_json::json!({
                "reason": "not_found",
                "request_id": id,
            })),
            _ => envelope,
        }
    }

    /// Rebuild a typed error from a wire envelope.
    pub fn from_envelope(envelope: &ErrorEnvelope) -> Self {
        let message = envelope.message.clone();
        match envelope.kind {
            ErrorKind::Unauthorized => Self::Unauthorized(strip_prefix(message, "Unauthorized: ")),
            ErrorKind::UserRejected => Self::UserRejected,
            ErrorKind::InvalidRequest => {
                let not_found = envelope.details.as_ref().and_then(|details| {
                    (details.get("reason")? == "not_found")
                        .then(|| details.get("request_id")?.as_u64())
                        .flatten()
                });
                match not_found {
                    Some(id) => Self::NotFound(id),
                    None => Self::InvalidRequest(strip_prefix(message, "Invalid request: ")),
                }
            }
            ErrorKind::MethodNotSupported => {
                Self::MethodNotSupported(strip_prefix(message, "Method not supported: "))
            }
            ErrorKind::ProviderFailure => {
                Self::ProviderFailure(strip_prefix(message, "Provider failure: "))
            }
            ErrorKind::Internal => Self::Internal(message),
        }
    }
}

impl From<&ConsentError> for ErrorEnvelope {
    fn from(error: &ConsentError) -> Self {
        error.to_envelope()
    }
}

impl From<ErrorEnvelope> for ConsentError {
    fn from(envelope: ErrorEnvelope) -> Self {
        Self::from_envelope(&envelope)
    }
}

fn strip_prefix(message: String, prefix: &str) -> String {
    match message.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => message,
    }
}
