//! # IPC Message Payloads
//!
//! Wire types for calls into the consent service from other contexts.
//! Errors travel as `ErrorEnvelope` and are rebuilt into `ConsentError` on
//! the receiving side.

use crate::domain::{ConsentError, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{CallerContext, ErrorEnvelope};
use uuid::Uuid;

/// A call into the consent service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcRequest {
    /// Echoed in the response.
    pub correlation_id: Uuid,
    /// Who is calling. Only internal senders may read or decide the queue.
    pub sender: CallerContext,
    #[serde(flatten)]
    pub call: ConsentCall,
}

impl IpcRequest {
    pub fn new(sender: CallerContext, call: ConsentCall) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            sender,
            call,
        }
    }
}

/// The operation requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum ConsentCall {
    /// `request` is kept raw so an unknown request type can be told apart
    /// from a malformed payload.
    RequestConsent {
        request: Value,
        #[serde(default)]
        wait_for_completion: bool,
    },
    GetRequests,
    ClearRequests {
        #[serde(default)]
        kind: Option<String>,
    },
    ProcessRequest {
        id: RequestId,
        approve: bool,
    },
}

impl ConsentCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::RequestConsent { .. } => "request_consent",
            Self::GetRequests => "get_requests",
            Self::ClearRequests { .. } => "clear_requests",
            Self::ProcessRequest { .. } => "process_request",
        }
    }
}

/// Response to an `IpcRequest`. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    pub correlation_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl IpcResponse {
    pub fn ok(correlation_id: Uuid, result: Value) -> Self {
        Self {
            correlation_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(correlation_id: Uuid, error: &ConsentError) -> Self {
        Self {
            correlation_id,
            result: None,
            error: Some(error.to_envelope()),
        }
    }

    /// Rebuild the typed result on the receiving side.
    pub fn into_result(self) -> Result<Value, ConsentError> {
        match self.error {
            Some(envelope) => Err(ConsentError::from(envelope)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ErrorKind;

    #[test]
    fn test_request_wire_shape() {
        let request: IpcRequest = serde_json::from_value(serde_json::json!({
            "correlation_id": "00000000-0000-0000-0000-000000000001",
            "sender": "internal",
            "method": "process_request",
            "params": { "id": 4, "approve": true }
        }))
        .unwrap();

        assert_eq!(request.sender, CallerContext::Internal);
        assert_eq!(request.call, ConsentCall::ProcessRequest { id: 4, approve: true });
        assert_eq!(request.call.method(), "process_request");
    }

    #[test]
    fn test_error_response_rebuilds_typed_error() {
        let id = Uuid::new_v4();
        let response = IpcResponse::err(id, &ConsentError::UserRejected);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], 4001);
        assert!(json.get("result").is_none());

        let parsed: IpcResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.error.as_ref().map(|e| e.kind), Some(ErrorKind::UserRejected));
        assert_eq!(parsed.into_result(), Err(ConsentError::UserRejected));
    }
}
