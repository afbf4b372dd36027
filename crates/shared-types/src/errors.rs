//! # Error Taxonomy
//!
//! Error kinds shared by every wallet subsystem and by callers on the other
//! side of a context boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of error kinds a consent request can fail with.
///
/// Codes follow the EIP-1193 provider error convention so external callers
/// can map them without knowing the wallet internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Account cannot sign, or no approved account context exists.
    Unauthorized,
    /// Human denied, bulk clear, or unlock surface dismissed.
    UserRejected,
    /// Semantically invalid payload.
    InvalidRequest,
    /// Request type or method not recognized.
    MethodNotSupported,
    /// Signing or broadcast collaborator failed.
    ProviderFailure,
    /// Anything the caller cannot act upon (storage, shutdown).
    Internal,
}

impl ErrorKind {
    /// Numeric code reported to external callers.
    pub const fn code(self) -> i32 {
        match self {
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::MethodNotSupported => 4200,
            Self::InvalidRequest => -32602,
            Self::ProviderFailure | Self::Internal => -32603,
        }
    }

    /// Rejections the approver caused on purpose.
    pub const fn is_user_rejection(self) -> bool {
        matches!(self, Self::UserRejected)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::UserRejected => "user_rejected",
            Self::InvalidRequest => "invalid_request",
            Self::MethodNotSupported => "method_not_supported",
            Self::ProviderFailure => "provider_failure",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}
