//! Inbound (Driving) ports for the consent arbiter.

use crate::domain::{
    ConsentRequest, ConsentResponse, ConsentResult, ConsentType, NewConsentRequest, RequestId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::CallerContext;

/// What `request_consent` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsentReceipt {
    /// Queued; the caller chose not to wait for the decision.
    Queued { id: RequestId },
    /// Approved and dispatched.
    Completed {
        id: RequestId,
        response: ConsentResponse,
    },
}

impl ConsentReceipt {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Queued { id } | Self::Completed { id, .. } => *id,
        }
    }
}

/// Consent API.
///
/// Reached from every execution context; the implementation serializes all
/// mutations behind one owner.
#[async_trait]
pub trait ConsentApi: Send + Sync {
    /// Admit and queue a request.
    ///
    /// Admission failures return immediately without touching the queue.
    /// With `wait_for_completion` the call returns once the request settles,
    /// and a rejection is returned as the error.
    async fn request_consent(
        &self,
        request: NewConsentRequest,
        context: CallerContext,
        wait_for_completion: bool,
    ) -> ConsentResult<ConsentReceipt>;

    /// Current queue snapshot in display order.
    async fn get_requests(&self) -> ConsentResult<Vec<ConsentRequest>>;

    /// Reject and remove every pending request of `kind` (all when `None`).
    ///
    /// Returns the number of removed requests.
    async fn clear_requests(&self, kind: Option<ConsentType>) -> ConsentResult<usize>;

    /// Apply the approver's decision.
    ///
    /// `Ok(None)` for a denial, `Ok(Some(response))` for a successful
    /// dispatch. A failed dispatch is returned as the error after the request
    /// has been settled and removed.
    async fn process_request(
        &self,
        id: RequestId,
        approve: bool,
    ) -> ConsentResult<Option<ConsentResponse>>;
}
