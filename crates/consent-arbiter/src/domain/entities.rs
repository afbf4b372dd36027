//! Consent domain entities.
//!
//! A `ConsentRequest` is the unit of work: one sensitive operation waiting
//! for a single human decision. Its payload is a closed sum type, so the
//! request type can never disagree with the payload shape.

use super::errors::ConsentError;
use serde::{Deserialize, Serialize};
use shared_types::{AccountId, ChainKind, NetworkDefinition, NetworkId, Origin};
use std::fmt;
use std::str::FromStr;

/// Monotonic request identifier. Never reused, including across restarts.
pub type RequestId = u64;

/// The closed set of consent request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentType {
    Unlock,
    RequestPermission,
    Transaction,
    SignMsg,
    SignTypedData,
    WatchAsset,
    AddNetwork,
    SwitchNetwork,
}

impl ConsentType {
    pub const ALL: [ConsentType; 8] = [
        Self::Unlock,
        Self::RequestPermission,
        Self::Transaction,
        Self::SignMsg,
        Self::SignTypedData,
        Self::WatchAsset,
        Self::AddNetwork,
        Self::SwitchNetwork,
    ];

    /// Types whose approval produces a signature with the account's key.
    pub const fn requires_signer(self) -> bool {
        matches!(self, Self::Transaction | Self::SignMsg | Self::SignTypedData)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unlock => "UNLOCK",
            Self::RequestPermission => "REQUEST_PERMISSION",
            Self::Transaction => "TRANSACTION",
            Self::SignMsg => "SIGN_MSG",
            Self::SignTypedData => "SIGN_TYPED_DATA",
            Self::WatchAsset => "WATCH_ASSET",
            Self::AddNetwork => "ADD_NETWORK",
            Self::SwitchNetwork => "SWITCH_NETWORK",
        }
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentType {
    type Err = ConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConsentError::MethodNotSupported(s.to_string()))
    }
}

/// One account, or an ordered list of accounts for multi-account grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountRef {
    Single(AccountId),
    Many(Vec<AccountId>),
}

impl AccountRef {
    /// The account when exactly one is referenced.
    pub fn single(&self) -> Option<&AccountId> {
        match self {
            Self::Single(account) => Some(account),
            Self::Many(_) => None,
        }
    }

    pub fn accounts(&self) -> Vec<AccountId> {
        match self {
            Self::Single(account) => vec![account.clone()],
            Self::Many(accounts) => accounts.clone(),
        }
    }
}

impl From<AccountId> for AccountRef {
    fn from(account: AccountId) -> Self {
        Self::Single(account)
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// A permission the site asks for, e.g. `eth_accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub capability: String,
    /// Network the grant applies to; the request's network when absent.
    #[serde(default)]
    pub network_id: Option<NetworkId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPayload {
    pub permissions: Vec<PermissionEntry>,
}

/// Chain-specific transaction parameters, opaque to this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
    /// Present only when replaying an already signed message.
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDataPayload {
    pub typed_data: serde_json::Value,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Token the site wants the account to track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAssetPayload {
    pub token: TokenDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNetworkPayload {
    pub network: NetworkDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchNetworkPayload {
    pub chain_kind: ChainKind,
    pub network_id: NetworkId,
}

/// Type-tagged request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentPayload {
    Unlock,
    RequestPermission(PermissionPayload),
    Transaction(TransactionPayload),
    SignMsg(MessagePayload),
    SignTypedData(TypedDataPayload),
    WatchAsset(WatchAssetPayload),
    AddNetwork(AddNetworkPayload),
    SwitchNetwork(SwitchNetworkPayload),
}

impl ConsentPayload {
    pub fn kind(&self) -> ConsentType {
        match self {
            Self::Unlock => ConsentType::Unlock,
            Self::RequestPermission(_) => ConsentType::RequestPermission,
            Self::Transaction(_) => ConsentType::Transaction,
            Self::SignMsg(_) => ConsentType::SignMsg,
            Self::SignTypedData(_) => ConsentType::SignTypedData,
            Self::WatchAsset(_) => ConsentType::WatchAsset,
            Self::AddNetwork(_) => ConsentType::AddNetwork,
            Self::SwitchNetwork(_) => ConsentType::SwitchNetwork,
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A request as submitted by a caller, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConsentRequest {
    #[serde(default)]
    pub network_id: Option<NetworkId>,
    pub account: AccountRef,
    #[serde(default)]
    pub origin: Option<Origin>,
    pub payload: ConsentPayload,
}

impl NewConsentRequest {
    pub fn new(account: impl Into<AccountRef>, payload: ConsentPayload) -> Self {
        Self {
            network_id: None,
            account: account.into(),
            origin: None,
            payload,
        }
    }

    #[must_use]
    pub fn on_network(mut self, network_id: NetworkId) -> Self {
        self.network_id = Some(network_id);
        self
    }

    #[must_use]
    pub fn from_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn kind(&self) -> ConsentType {
        self.payload.kind()
    }

    pub(crate) fn into_queued(self, id: RequestId) -> ConsentRequest {
        ConsentRequest {
            id,
            network_id: self.network_id,
            account: self.account,
            origin: self.origin,
            payload: self.payload,
        }
    }
}

/// A queued consent request. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub id: RequestId,
    #[serde(default)]
    pub network_id: Option<NetworkId>,
    pub account: AccountRef,
    #[serde(default)]
    pub origin: Option<Origin>,
    pub payload: ConsentPayload,
}

impl ConsentRequest {
    pub fn kind(&self) -> ConsentType {
        self.payload.kind()
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// A transaction signed ahead of dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Encoded signed transaction, as produced by the provider.
    pub raw: String,
    #[serde(default)]
    pub hash: Option<String>,
}

/// What is known about a dispatched transaction when settlement happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Broadcast accepted by the node.
    Submitted,
    /// Found on chain while polling.
    Confirmed,
    /// Submitted but never located within the polling budget.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub hash: String,
    pub status: TransactionStatus,
}

/// Result of an approved and dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsentResponse {
    Unlocked,
    PermissionsGranted {
        accounts: Vec<AccountId>,
        capabilities: Vec<String>,
    },
    Transaction(TransactionResponse),
    Signature {
        signature: String,
    },
    AssetWatched {
        address: String,
    },
    NetworkAdded {
        network_id: NetworkId,
    },
    NetworkSwitched {
        chain_kind: ChainKind,
        network_id: NetworkId,
    },
}

/// What a completion handle is settled with.
pub type ConsentOutcome = Result<ConsentResponse, ConsentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_matches_type() {
        let payload = ConsentPayload::SignMsg(MessagePayload {
            message: "hello".into(),
            signature: None,
        });
        assert_eq!(payload.kind(), ConsentType::SignMsg);
        assert!(payload.kind().requires_signer());
        assert!(!ConsentType::WatchAsset.requires_signer());
    }

    #[test]
    fn test_consent_type_from_str() {
        assert_eq!(
            "SIGN_TYPED_DATA".parse::<ConsentType>().unwrap(),
            ConsentType::SignTypedData
        );
        assert!(matches!(
            "eth_mine".parse::<ConsentType>(),
            Err(ConsentError::MethodNotSupported(_))
        ));
    }

    #[test]
    fn test_request_wire_shape() {
        let request = NewConsentRequest::new(AccountRef::Many(vec![]), ConsentPayload::Unlock)
            .into_queued(4);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["payload"]["type"], "UNLOCK");

        let parsed: ConsentRequest = serde_json::from_value(serde_json::json!({
            "id": 9,
            "network_id": "mainnet",
            "account": "acc-1",
            "payload": { "type": "TRANSACTION", "data": { "params": { "to": "0xab" } } }
        }))
        .unwrap();
        assert_eq!(parsed.kind(), ConsentType::Transaction);
        assert_eq!(parsed.account.single(), Some(&AccountId::new("acc-1")));
    }

    #[test]
    fn test_account_ref() {
        let many = AccountRef::Many(vec![AccountId::new("a"), AccountId::new("b")]);
        assert!(many.single().is_none());
        assert_eq!(many.accounts().len(), 2);
    }
}
