//! Admission gate: rejects requests that may never be queued.

use crate::domain::{check_shape, ConsentError, ConsentResult, NewConsentRequest};
use crate::ports::WalletStore;
use std::sync::Arc;
use tracing::warn;

pub struct AdmissionGate {
    wallets: Arc<dyn WalletStore>,
}

impl AdmissionGate {
    pub fn new(wallets: Arc<dyn WalletStore>) -> Self {
        Self { wallets }
    }

    /// Validate `request` without side effects.
    ///
    /// Signature-producing types need a single account whose wallet can sign.
    pub async fn admit(&self, request: &NewConsentRequest) -> ConsentResult<()> {
        let kind = request.kind();
        let account = match check_shape(request) {
            Ok(Some(account)) => account,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(kind = %kind, error = %err, "Consent request rejected at admission");
                return Err(err);
            }
        };

        match self.wallets.wallet_for_account(account).await {
            Some(wallet) if wallet.can_sign => Ok(()),
            Some(wallet) => {
                warn!(kind = %kind, account = %account, wallet = %wallet.id, "Wallet cannot sign");
                Err(ConsentError::Unauthorized(format!(
                    "account {account} belongs to a wallet that cannot sign"
                )))
            }
            None => {
                warn!(kind = %kind, account = %account, "No wallet owns account");
                Err(ConsentError::Unauthorized(format!(
                    "account {account} is not known to this wallet"
                )))
            }
        }
    }
}
