//! Outbound (Driven) ports for the consent arbiter.
//!
//! These traits describe the collaborators the arbiter needs. None of them
//! is implemented here beyond the in-memory adapters; chain encoding, key
//! custody and UI live behind them.

use crate::domain::{ConsentError, SignedTransaction, TokenDescriptor};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{AccountId, ChainKind, NetworkDefinition, NetworkId, Origin, WalletId};
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<StoreError> for ConsentError {
    fn from(err: StoreError) -> Self {
        ConsentError::Storage(err.to_string())
    }
}

/// Durable key-value persistence.
///
/// `set` must be durable when it returns: the arbiter treats a successful
/// write as the point where a mutation becomes authoritative.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

// =============================================================================
// WALLETS
// =============================================================================

/// What the arbiter needs to know about the wallet owning an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub id: WalletId,
    /// False for watch-only wallets.
    pub can_sign: bool,
}

/// Account and wallet lookup.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Resolve the wallet that owns `account`.
    async fn wallet_for_account(&self, account: &AccountId) -> Option<WalletInfo>;

    /// Whether key material is currently locked.
    async fn is_locked(&self) -> bool;
}

// =============================================================================
// CHAIN PROVIDERS
// =============================================================================

/// What gets handed to `send_transaction`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionSubmission {
    /// Signed before dispatch (EVM-style chains).
    Signed(SignedTransaction),
    /// Raw params; the provider signs and submits in one step (Aptos-style).
    Unsigned(Value),
}

/// Per-chain signing and broadcast.
#[async_trait]
pub trait Provider: Send + Sync {
    fn chain_kind(&self) -> ChainKind;

    async fn sign_transaction(
        &self,
        account: &AccountId,
        params: &Value,
    ) -> Result<SignedTransaction, ConsentError>;

    /// Broadcast and return the transaction hash.
    async fn send_transaction(
        &self,
        account: &AccountId,
        submission: TransactionSubmission,
    ) -> Result<String, ConsentError>;

    /// Look a transaction up by hash; `Ok(None)` when not yet visible.
    async fn get_transaction(&self, hash: &str) -> Result<Option<Value>, ConsentError>;

    async fn sign_message(&self, account: &AccountId, message: &str)
        -> Result<String, ConsentError>;

    async fn sign_typed_data(
        &self,
        account: &AccountId,
        typed_data: &Value,
    ) -> Result<String, ConsentError>;
}

/// Resolves the provider serving a network.
pub trait ProviderRegistry: Send + Sync {
    fn provider_for(&self, network_id: &NetworkId) -> Result<Arc<dyn Provider>, ConsentError>;
}

// =============================================================================
// PRESENTATION
// =============================================================================

/// Context handed to the approval surface when it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceContext {
    /// Request that caused the surface to open, if any.
    pub request_id: Option<u64>,
    pub origin: Option<Origin>,
}

/// Out-of-process UI.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Open the approval surface, or focus it when already open.
    async fn open_approval_surface(&self, context: SurfaceContext);

    async fn show_notification(&self, title: &str, message: &str, link: Option<&str>);

    /// Set the badge text; `None` clears it.
    async fn set_badge(&self, text: Option<String>);
}

// =============================================================================
// BOOKKEEPING
// =============================================================================

/// Site connection bookkeeping.
#[async_trait]
pub trait SiteConnector: Send + Sync {
    /// Replace the accounts connected to `origin` on `network_id`.
    async fn replace_connected_accounts(
        &self,
        origin: &Origin,
        network_id: Option<&NetworkId>,
        accounts: &[AccountId],
        capability: &str,
    ) -> Result<(), ConsentError>;
}

/// A tracked token as stored for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub token: TokenDescriptor,
    pub visible: bool,
}

/// Token visibility bookkeeping.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    async fn find(
        &self,
        account: &AccountId,
        network_id: Option<&NetworkId>,
        address: &str,
    ) -> Result<Option<TokenEntry>, ConsentError>;

    async fn set_visible(
        &self,
        account: &AccountId,
        network_id: Option<&NetworkId>,
        address: &str,
        visible: bool,
    ) -> Result<(), ConsentError>;

    async fn add(
        &self,
        account: &AccountId,
        network_id: Option<&NetworkId>,
        token: TokenDescriptor,
    ) -> Result<(), ConsentError>;
}

/// Network definitions and the active network per chain kind.
#[async_trait]
pub trait NetworkRegistry: Send + Sync {
    async fn add_network(&self, network: NetworkDefinition) -> Result<(), ConsentError>;

    async fn set_active(
        &self,
        chain_kind: ChainKind,
        network_id: &NetworkId,
    ) -> Result<(), ConsentError>;
}

/// Pending-transaction tracking.
#[async_trait]
pub trait TransactionWatcher: Send + Sync {
    async fn add_pending(
        &self,
        account: &AccountId,
        network_id: &NetworkId,
        hash: &str,
    ) -> Result<(), ConsentError>;
}

/// All collaborators the arbiter is wired with.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub providers: Arc<dyn ProviderRegistry>,
    pub presenter: Arc<dyn Presenter>,
    pub sites: Arc<dyn SiteConnector>,
    pub tokens: Arc<dyn TokenRegistry>,
    pub networks: Arc<dyn NetworkRegistry>,
    pub watcher: Arc<dyn TransactionWatcher>,
}
