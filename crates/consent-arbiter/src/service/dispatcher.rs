//! Side-effect dispatcher.
//!
//! Runs the real-world effect of an approved request through the matching
//! collaborator. It never retries: a failure becomes the settlement outcome.

use super::ConsentConfig;
use crate::domain::{
    AddNetworkPayload, ConsentError, ConsentOutcome, ConsentPayload, ConsentRequest,
    ConsentResponse, ConsentResult, ConsentType, MessagePayload, PermissionPayload,
    SignedTransaction, SwitchNetworkPayload, TransactionPayload, TransactionResponse,
    TransactionStatus, TypedDataPayload, WatchAssetPayload,
};
use crate::ports::{Collaborators, Provider, TransactionSubmission};
use shared_types::{AccountId, NetworkId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes approved requests.
pub struct SideEffectDispatcher {
    collaborators: Collaborators,
    config: ConsentConfig,
}

impl SideEffectDispatcher {
    pub fn new(collaborators: Collaborators, config: ConsentConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Run the approved request to its outcome.
    ///
    /// Transaction failures other than user rejections are also shown to
    /// the user as a notification.
    pub async fn execute(&self, request: &ConsentRequest) -> ConsentOutcome {
        let outcome = self.run(request).await;

        if let Err(err) = &outcome {
            warn!(request_id = request.id, kind = %request.kind(), error = %err, "Dispatch failed");
            if request.kind() == ConsentType::Transaction && !err.is_user_rejection() {
                self.collaborators
                    .presenter
                    .show_notification(
                        "Transaction failed",
                        &err.to_string(),
                        self.config.approval_surface_url.as_deref(),
                    )
                    .await;
            }
        }
        outcome
    }

    async fn run(&self, request: &ConsentRequest) -> ConsentOutcome {
        match &request.payload {
            ConsentPayload::Unlock => Ok(ConsentResponse::Unlocked),
            ConsentPayload::RequestPermission(payload) => {
                self.grant_permissions(request, payload).await
            }
            ConsentPayload::Transaction(payload) => {
                let signed = self.presign(request, payload).await?;
                self.send_transaction(request, payload, signed).await
            }
            ConsentPayload::SignMsg(payload) => self.sign_message(request, payload).await,
            ConsentPayload::SignTypedData(payload) => self.sign_typed_data(request, payload).await,
            ConsentPayload::WatchAsset(payload) => self.watch_asset(request, payload).await,
            ConsentPayload::AddNetwork(payload) => self.add_network(payload).await,
            ConsentPayload::SwitchNetwork(payload) => self.switch_network(payload).await,
        }
    }

    /// Sign ahead of broadcast on chains that need it.
    async fn presign(
        &self,
        request: &ConsentRequest,
        payload: &TransactionPayload,
    ) -> ConsentResult<Option<SignedTransaction>> {
        let provider = self.provider(request)?;
        if !provider.chain_kind().signs_before_dispatch() {
            return Ok(None);
        }

        let account = signer(request)?;
        let signed = provider.sign_transaction(account, &payload.params).await?;
        debug!(request_id = request.id, "Transaction signed before dispatch");
        Ok(Some(signed))
    }

    async fn send_transaction(
        &self,
        request: &ConsentRequest,
        payload: &TransactionPayload,
        signed: Option<SignedTransaction>,
    ) -> ConsentOutcome {
        let provider = self.provider(request)?;
        let account = signer(request)?;
        let network_id = network(request)?;

        let (hash, status) = match signed {
            Some(signed) => {
                let hash = provider
                    .send_transaction(account, TransactionSubmission::Signed(signed))
                    .await?;
                (hash, TransactionStatus::Submitted)
            }
            None => {
                let unsigned = TransactionSubmission::Unsigned(payload.params.clone());
                let hash = provider.send_transaction(account, unsigned).await?;
                let status = if provider.chain_kind().confirms_by_polling() {
                    self.await_visibility(provider.as_ref(), &hash).await
                } else {
                    TransactionStatus::Submitted
                };
                (hash, status)
            }
        };

        if let Err(err) = self
            .collaborators
            .watcher
            .add_pending(account, network_id, &hash)
            .await
        {
            warn!(request_id = request.id, hash = %hash, error = %err, "Failed to record pending transaction");
        }

        info!(request_id = request.id, hash = %hash, status = ?status, "Transaction dispatched");
        Ok(ConsentResponse::Transaction(TransactionResponse { hash, status }))
    }

    /// Poll until the transaction is visible or the attempts run out.
    ///
    /// Running out is not an error; the status is reported as `Unknown`.
    async fn await_visibility(&self, provider: &dyn Provider, hash: &str) -> TransactionStatus {
        for attempt in 1..=self.config.confirmation_poll_attempts {
            match provider.get_transaction(hash).await {
                Ok(Some(_)) => return TransactionStatus::Confirmed,
                Ok(None) => {}
                Err(err) => debug!(hash, attempt, error = %err, "Transaction lookup failed"),
            }
            if attempt < self.config.confirmation_poll_attempts {
                tokio::time::sleep(self.config.confirmation_poll_interval).await;
            }
        }

        warn!(
            hash,
            attempts = self.config.confirmation_poll_attempts,
            "Transaction not visible after polling"
        );
        TransactionStatus::Unknown
    }

    async fn grant_permissions(
        &self,
        request: &ConsentRequest,
        payload: &PermissionPayload,
    ) -> ConsentOutcome {
        let origin = request.origin.as_ref().ok_or_else(|| {
            ConsentError::InvalidRequest("permission request without origin".into())
        })?;
        let accounts = request.account.accounts();
        if accounts.is_empty() {
            return Err(ConsentError::Unauthorized(
                "no account approved for this site".into(),
            ));
        }

        for entry in &payload.permissions {
            let network_id = entry.network_id.as_ref().or(request.network_id.as_ref());
            self.collaborators
                .sites
                .replace_connected_accounts(origin, network_id, &accounts, &entry.capability)
                .await?;
        }

        Ok(ConsentResponse::PermissionsGranted {
            accounts,
            capabilities: payload
                .permissions
                .iter()
                .map(|entry| entry.capability.clone())
                .collect(),
        })
    }

    async fn sign_message(
        &self,
        request: &ConsentRequest,
        payload: &MessagePayload,
    ) -> ConsentOutcome {
        if let Some(signature) = &payload.signature {
            return Ok(ConsentResponse::Signature {
                signature: signature.clone(),
            });
        }
        let signature = self
            .provider(request)?
            .sign_message(signer(request)?, &payload.message)
            .await?;
        Ok(ConsentResponse::Signature { signature })
    }

    async fn sign_typed_data(
        &self,
        request: &ConsentRequest,
        payload: &TypedDataPayload,
    ) -> ConsentOutcome {
        if let Some(signature) = &payload.signature {
            return Ok(ConsentResponse::Signature {
                signature: signature.clone(),
            });
        }
        let signature = self
            .provider(request)?
            .sign_typed_data(signer(request)?, &payload.typed_data)
            .await?;
        Ok(ConsentResponse::Signature { signature })
    }

    async fn watch_asset(
        &self,
        request: &ConsentRequest,
        payload: &WatchAssetPayload,
    ) -> ConsentOutcome {
        let account = signer(request)?;
        let network_id = request.network_id.as_ref();
        let address = payload.token.address.as_str();
        let tokens = &self.collaborators.tokens;

        match tokens.find(account, network_id, address).await? {
            Some(entry) if entry.visible => {
                return Err(ConsentError::InvalidRequest(format!(
                    "token {address} already exists"
                )));
            }
            Some(_) => tokens.set_visible(account, network_id, address, true).await?,
            None => tokens.add(account, network_id, payload.token.clone()).await?,
        }

        Ok(ConsentResponse::AssetWatched {
            address: address.to_string(),
        })
    }

    async fn add_network(&self, payload: &AddNetworkPayload) -> ConsentOutcome {
        let network_id = payload.network.id.clone();
        self.collaborators
            .networks
            .add_network(payload.network.clone())
            .await?;
        Ok(ConsentResponse::NetworkAdded { network_id })
    }

    async fn switch_network(&self, payload: &SwitchNetworkPayload) -> ConsentOutcome {
        self.collaborators
            .networks
            .set_active(payload.chain_kind, &payload.network_id)
            .await?;
        Ok(ConsentResponse::NetworkSwitched {
            chain_kind: payload.chain_kind,
            network_id: payload.network_id.clone(),
        })
    }

    fn provider(&self, request: &ConsentRequest) -> ConsentResult<Arc<dyn Provider>> {
        self.collaborators.providers.provider_for(network(request)?)
    }
}

fn signer(request: &ConsentRequest) -> ConsentResult<&AccountId> {
    request.account.single().ok_or_else(|| {
        ConsentError::InvalidRequest(format!("{} requires exactly one account", request.kind()))
    })
}

fn network(request: &ConsentRequest) -> ConsentResult<&NetworkId> {
    request.network_id.as_ref().ok_or_else(|| {
        ConsentError::InvalidRequest(format!("{} requires a network", request.kind()))
    })
}
