//! IPC message handler for the consent service.
//!
//! Checks who is calling, decodes the call, runs it through `ConsentApi` and
//! folds the outcome into an `IpcResponse`.

use super::messages::{ConsentCall, IpcRequest, IpcResponse};
use crate::domain::{ConsentError, ConsentResult, ConsentType, NewConsentRequest};
use crate::ports::ConsentApi;
use serde::Serialize;
use serde_json::Value;
use shared_types::CallerContext;
use tracing::{debug, warn};

/// IPC handler in front of a `ConsentApi`.
pub struct ConsentIpcHandler<A: ConsentApi> {
    api: A,
}

impl<A: ConsentApi> ConsentIpcHandler<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Handle one request. Never fails: errors become envelopes.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let IpcRequest {
            correlation_id,
            sender,
            call,
        } = request;
        let method = call.method();
        debug!(correlation_id = %correlation_id, method, sender = ?sender, "IPC call");

        match self.dispatch(sender, call).await {
            Ok(result) => IpcResponse::ok(correlation_id, result),
            Err(err) => {
                debug!(correlation_id = %correlation_id, method, error = %err, "IPC call failed");
                IpcResponse::err(correlation_id, &err)
            }
        }
    }

    async fn dispatch(&self, sender: CallerContext, call: ConsentCall) -> ConsentResult<Value> {
        match call {
            ConsentCall::RequestConsent {
                request,
                wait_for_completion,
            } => {
                let request = decode_request(request)?;
                let receipt = self
                    .api
                    .request_consent(request, sender, wait_for_completion)
                    .await?;
                to_value(&receipt)
            }
            ConsentCall::GetRequests => {
                authorize(sender, "get_requests")?;
                to_value(&self.api.get_requests().await?)
            }
            ConsentCall::ClearRequests { kind } => {
                authorize(sender, "clear_requests")?;
                let kind = kind.as_deref().map(str::parse::<ConsentType>).transpose()?;
                to_value(&self.api.clear_requests(kind).await?)
            }
            ConsentCall::ProcessRequest { id, approve } => {
                authorize(sender, "process_request")?;
                to_value(&self.api.process_request(id, approve).await?)
            }
        }
    }
}

/// Only the wallet's own contexts may read or decide the queue.
fn authorize(sender: CallerContext, method: &str) -> ConsentResult<()> {
    if sender.is_external() {
        warn!(method, "External sender refused");
        return Err(ConsentError::Unauthorized(format!(
            "{method} is restricted to the wallet"
        )));
    }
    Ok(())
}

/// Decode a raw request.
///
/// An unrecognized `payload.type` is `MethodNotSupported`; any other decoding
/// failure is `InvalidRequest`.
fn decode_request(raw: Value) -> ConsentResult<NewConsentRequest> {
    if let Some(kind) = raw
        .get("payload")
        .and_then(|payload| payload.get("type"))
        .and_then(Value::as_str)
    {
        kind.parse::<ConsentType>()?;
    }
    serde_json::from_value(raw).map_err(|err| ConsentError::InvalidRequest(err.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> ConsentResult<Value> {
    serde_json::to_value(value).map_err(|err| ConsentError::Internal(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConsentRequest, ConsentResponse, RequestId};
    use crate::ports::ConsentReceipt;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_types::ErrorKind;

    /// Records calls; queues every request as id 7.
    #[derive(Default)]
    struct MockApi {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl ConsentApi for MockApi {
        async fn request_consent(
            &self,
            _request: NewConsentRequest,
            _context: CallerContext,
            _wait: bool,
        ) -> ConsentResult<ConsentReceipt> {
            self.calls.lock().push("request_consent");
            Ok(ConsentReceipt::Queued { id: 7 })
        }

        async fn get_requests(&self) -> ConsentResult<Vec<ConsentRequest>> {
            self.calls.lock().push("get_requests");
            Ok(Vec::new())
        }

        async fn clear_requests(&self, _kind: Option<ConsentType>) -> ConsentResult<usize> {
            self.calls.lock().push("clear_requests");
            Ok(0)
        }

        async fn process_request(
            &self,
            id: RequestId,
            _approve: bool,
        ) -> ConsentResult<Option<ConsentResponse>> {
            self.calls.lock().push("process_request");
            Err(ConsentError::NotFound(id))
        }
    }

    fn call(sender: CallerContext, call: ConsentCall) -> IpcRequest {
        IpcRequest::new(sender, call)
    }

    #[tokio::test]
    async fn test_external_request_consent() {
        let handler = ConsentIpcHandler::new(MockApi::default());
        let response = handler
            .handle(call(
                CallerContext::External,
                ConsentCall::RequestConsent {
                    request: json!({ "account": "acc", "payload": { "type": "UNLOCK" } }),
                    wait_for_completion: false,
                },
            ))
            .await;

        let result = response.into_result().unwrap();
        assert_eq!(result, json!({ "status": "queued", "id": 7 }));
    }

    #[tokio::test]
    async fn test_external_sender_cannot_decide() {
        let handler = ConsentIpcHandler::new(MockApi::default());
        let response = handler
            .handle(call(
                CallerContext::External,
                ConsentCall::ProcessRequest { id: 1, approve: true },
            ))
            .await;

        assert_eq!(response.error.as_ref().map(|e| e.kind), Some(ErrorKind::Unauthorized));
        assert!(handler.api().calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_is_method_not_supported() {
        let handler = ConsentIpcHandler::new(MockApi::default());
        let response = handler
            .handle(call(
                CallerContext::External,
                ConsentCall::RequestConsent {
                    request: json!({ "account": "acc", "payload": { "type": "MINE_BLOCK" } }),
                    wait_for_completion: false,
                },
            ))
            .await;

        assert!(matches!(
            response.into_result(),
            Err(ConsentError::MethodNotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_invalid_request() {
        let handler = ConsentIpcHandler::new(MockApi::default());
        let response = handler
            .handle(call(
                CallerContext::External,
                ConsentCall::RequestConsent {
                    request: json!({ "account": "acc", "payload": { "type": "SIGN_MSG", "data": {} } }),
                    wait_for_completion: false,
                },
            ))
            .await;

        assert!(matches!(
            response.into_result(),
            Err(ConsentError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_not_found_survives_envelope() {
        let handler = ConsentIpcHandler::new(MockApi::default());
        let response = handler
            .handle(call(
                CallerContext::Internal,
                ConsentCall::ProcessRequest { id: 9, approve: false },
            ))
            .await;

        assert_eq!(response.into_result(), Err(ConsentError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_clear_with_unknown_kind() {
        let handler = ConsentIpcHandler::new(MockApi::default());
        let response = handler
            .handle(call(
                CallerContext::Internal,
                ConsentCall::ClearRequests {
                    kind: Some("EVERYTHING".into()),
                },
            ))
            .await;

        assert!(matches!(
            response.into_result(),
            Err(ConsentError::MethodNotSupported(_))
        ));
        assert!(handler.api().calls.lock().is_empty());
    }
}
