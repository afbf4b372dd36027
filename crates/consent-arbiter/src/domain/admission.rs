//! Payload-shape checks run before a request may be queued.
//!
//! The wallet lookup happens in the service; these rules only need the
//! request itself.

use super::entities::NewConsentRequest;
use super::errors::{ConsentError, ConsentResult};
use shared_types::AccountId;

/// Validate the request shape.
///
/// Returns the signing account for types that produce a signature.
pub fn check_shape(request: &NewConsentRequest) -> ConsentResult<Option<&AccountId>> {
    let kind = request.kind();
    if !kind.requires_signer() {
        return Ok(None);
    }

    request.account.single().map(Some).ok_or_else(|| {
        ConsentError::InvalidRequest(format!("{kind} requires exactly one account"))
    })
}
