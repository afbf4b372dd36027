//! In-memory collaborator adapters.
//!
//! Used by the runtime where no external system exists yet, and by tests as
//! fakes with a few knobs for failure injection.

use crate::domain::{ConsentError, SignedTransaction, TokenDescriptor};
use crate::ports::{
    KeyValueStore, NetworkRegistry, Presenter, Provider, ProviderRegistry, SiteConnector,
    StoreError, SurfaceContext, TokenEntry, TokenRegistry, TransactionSubmission,
    TransactionWatcher, WalletInfo, WalletStore,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use shared_bus::{EventPublisher, InMemoryEventBus, WalletEvent};
use shared_types::{AccountId, ChainKind, NetworkDefinition, NetworkId, Origin, WalletId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// STORE
// =============================================================================

/// Key-value store held in memory.
#[derive(Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, Value>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `set` fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("write refused")));
        }
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// WALLETS
// =============================================================================

/// Accounts mapped to wallets, plus a lock flag.
pub struct InMemoryWalletStore {
    accounts: RwLock<HashMap<AccountId, WalletInfo>>,
    locked: AtomicBool,
}

impl Default for InMemoryWalletStore {
    fn default() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            locked: AtomicBool::new(true),
        }
    }
}

impl InMemoryWalletStore {
    /// Empty and locked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account owned by its own wallet.
    #[must_use]
    pub fn with_account(self, account: &str, can_sign: bool) -> Self {
        self.insert(AccountId::new(account), can_sign);
        self
    }

    pub fn insert(&self, account: AccountId, can_sign: bool) {
        let info = WalletInfo {
            id: WalletId(format!("wallet-{account}")),
            can_sign,
        };
        self.accounts.write().insert(account, info);
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn wallet_for_account(&self, account: &AccountId) -> Option<WalletInfo> {
        self.accounts.read().get(account).cloned()
    }

    async fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

// =============================================================================
// PROVIDERS
// =============================================================================

/// Deterministic provider.
///
/// Signatures are derived from the inputs, hashes are sequential, and a sent
/// transaction becomes visible after a configurable number of lookups.
pub struct InMemoryProvider {
    chain_kind: ChainKind,
    next_hash: AtomicU64,
    lookups: AtomicU32,
    visible_after: Option<u32>,
    failure: RwLock<Option<ConsentError>>,
    sent: RwLock<Vec<TransactionSubmission>>,
}

impl InMemoryProvider {
    /// Transactions are visible on the first lookup.
    pub fn new(chain_kind: ChainKind) -> Self {
        Self {
            chain_kind,
            next_hash: AtomicU64::new(1),
            lookups: AtomicU32::new(0),
            visible_after: Some(1),
            failure: RwLock::new(None),
            sent: RwLock::new(Vec::new()),
        }
    }

    /// Visible after `lookups` lookups; `None` never becomes visible.
    #[must_use]
    pub fn visible_after(mut self, lookups: Option<u32>) -> Self {
        self.visible_after = lookups;
        self
    }

    /// Fail every signing and broadcast call with `error`.
    pub fn fail_with(&self, error: ConsentError) {
        *self.failure.write() = Some(error);
    }

    pub fn sent(&self) -> Vec<TransactionSubmission> {
        self.sent.read().clone()
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ConsentError> {
        match self.failure.read().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    fn chain_kind(&self) -> ChainKind {
        self.chain_kind
    }

    async fn sign_transaction(
        &self,
        account: &AccountId,
        params: &Value,
    ) -> Result<SignedTransaction, ConsentError> {
        self.check()?;
        Ok(SignedTransaction {
            raw: format!("signed:{account}:{params}"),
            hash: None,
        })
    }

    async fn send_transaction(
        &self,
        _account: &AccountId,
        submission: TransactionSubmission,
    ) -> Result<String, ConsentError> {
        self.check()?;
        self.sent.write().push(submission);
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0x{n:064x}"))
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<Value>, ConsentError> {
        let seen = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(match self.visible_after {
            Some(after) if seen >= after => Some(serde_json::json!({ "hash": hash })),
            _ => None,
        })
    }

    async fn sign_message(
        &self,
        account: &AccountId,
        message: &str,
    ) -> Result<String, ConsentError> {
        self.check()?;
        Ok(format!("sig:{account}:{message}"))
    }

    async fn sign_typed_data(
        &self,
        account: &AccountId,
        typed_data: &Value,
    ) -> Result<String, ConsentError> {
        self.check()?;
        Ok(format!("sig:{account}:{typed_data}"))
    }
}

/// Fixed network → provider table.
#[derive(Default)]
pub struct StaticProviderRegistry {
    providers: HashMap<NetworkId, Arc<dyn Provider>>,
}

impl StaticProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, network_id: NetworkId, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(network_id, provider);
        self
    }
}

impl ProviderRegistry for StaticProviderRegistry {
    fn provider_for(&self, network_id: &NetworkId) -> Result<Arc<dyn Provider>, ConsentError> {
        self.providers.get(network_id).cloned().ok_or_else(|| {
            ConsentError::ProviderFailure(format!("no provider for network {network_id}"))
        })
    }
}

// =============================================================================
// PRESENTER
// =============================================================================

/// A notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

/// Presenter that records what it was asked to show.
///
/// With a bus attached, opening the surface publishes `SurfaceOpened`.
#[derive(Default)]
pub struct RecordingPresenter {
    surfaces: RwLock<Vec<SurfaceContext>>,
    notifications: RwLock<Vec<Notification>>,
    badge: RwLock<Option<String>>,
    bus: Option<Arc<InMemoryEventBus>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bus(mut self, bus: Arc<InMemoryEventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn surfaces(&self) -> Vec<SurfaceContext> {
        self.surfaces.read().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    pub fn badge(&self) -> Option<String> {
        self.badge.read().clone()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn open_approval_surface(&self, context: SurfaceContext) {
        self.surfaces.write().push(context);
        if let Some(bus) = &self.bus {
            bus.publish(WalletEvent::SurfaceOpened).await;
        }
    }

    async fn show_notification(&self, title: &str, message: &str, link: Option<&str>) {
        self.notifications.write().push(Notification {
            title: title.to_string(),
            message: message.to_string(),
            link: link.map(str::to_string),
        });
    }

    async fn set_badge(&self, text: Option<String>) {
        *self.badge.write() = text;
    }
}

// =============================================================================
// BOOKKEEPING
// =============================================================================

type ConnectionKey = (Origin, Option<NetworkId>, String);

/// Connected accounts per origin, network and capability.
#[derive(Default)]
pub struct InMemorySiteConnector {
    connections: RwLock<HashMap<ConnectionKey, Vec<AccountId>>>,
}

impl InMemorySiteConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(
        &self,
        origin: &Origin,
        network_id: Option<&NetworkId>,
        capability: &str,
    ) -> Vec<AccountId> {
        let key = (origin.clone(), network_id.cloned(), capability.to_string());
        self.connections.read().get(&key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SiteConnector for InMemorySiteConnector {
    async fn replace_connected_accounts(
        &self,
        origin: &Origin,
        network_id: Option<&NetworkId>,
        accounts: &[AccountId],
        capability: &str,
    ) -> Result<(), ConsentError> {
        let key = (origin.clone(), network_id.cloned(), capability.to_string());
        self.connections.write().insert(key, accounts.to_vec());
        Ok(())
    }
}

type TokenKey = (AccountId, Option<NetworkId>, String);

/// Token entries per account and network, keyed by lowercase address.
#[derive(Default)]
pub struct InMemoryTokenRegistry {
    tokens: RwLock<HashMap<TokenKey, TokenEntry>>,
}

impl InMemoryTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }

    fn key(account: &AccountId, network_id: Option<&NetworkId>, address: &str) -> TokenKey {
        (account.clone(), network_id.cloned(), address.to_lowercase())
    }
}

#[async_trait]
impl TokenRegistry for InMemoryTokenRegistry {
    async fn find(
        &self,
        account: &AccountId,
        network_id: Option<&NetworkId>,
        address: &str,
    ) -> Result<Option<TokenEntry>, ConsentError> {
        let key = Self::key(account, network_id, address);
        Ok(self.tokens.read().get(&key).cloned())
    }

    async fn set_visible(
        &self,
        account: &AccountId,
        network_id: Option<&NetworkId>,
        address: &str,
        visible: bool,
    ) -> Result<(), ConsentError> {
        let key = Self::key(account, network_id, address);
        match self.tokens.write().get_mut(&key) {
            Some(entry) => {
                entry.visible = visible;
                Ok(())
            }
            None => Err(ConsentError::InvalidRequest(format!("token {address} not tracked"))),
        }
    }

    async fn add(
        &self,
        account: &AccountId,
        network_id: Option<&NetworkId>,
        token: TokenDescriptor,
    ) -> Result<(), ConsentError> {
        let key = Self::key(account, network_id, &token.address);
        self.tokens.write().insert(
            key,
            TokenEntry {
                token,
                visible: true,
            },
        );
        Ok(())
    }
}

/// Known networks and the active one per chain kind.
#[derive(Default)]
pub struct InMemoryNetworkRegistry {
    networks: RwLock<HashMap<NetworkId, NetworkDefinition>>,
    active: RwLock<HashMap<ChainKind, NetworkId>>,
}

impl InMemoryNetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self, id: &NetworkId) -> Option<NetworkDefinition> {
        self.networks.read().get(id).cloned()
    }

    pub fn active(&self, chain_kind: ChainKind) -> Option<NetworkId> {
        self.active.read().get(&chain_kind).cloned()
    }
}

#[async_trait]
impl NetworkRegistry for InMemoryNetworkRegistry {
    async fn add_network(&self, network: NetworkDefinition) -> Result<(), ConsentError> {
        let mut networks = self.networks.write();
        if networks.contains_key(&network.id) {
            return Err(ConsentError::InvalidRequest(format!(
                "network {} already exists",
                network.id
            )));
        }
        networks.insert(network.id.clone(), network);
        Ok(())
    }

    async fn set_active(
        &self,
        chain_kind: ChainKind,
        network_id: &NetworkId,
    ) -> Result<(), ConsentError> {
        let known = self
            .networks
            .read()
            .get(network_id)
            .is_some_and(|network| network.chain_kind == chain_kind);
        if !known {
            return Err(ConsentError::InvalidRequest(format!(
                "unknown {chain_kind} network {network_id}"
            )));
        }
        self.active.write().insert(chain_kind, network_id.clone());
        Ok(())
    }
}

/// A transaction recorded for confirmation tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub account: AccountId,
    pub network_id: NetworkId,
    pub hash: String,
}

#[derive(Default)]
pub struct InMemoryTransactionWatcher {
    pending: RwLock<Vec<PendingTransaction>>,
}

impl InMemoryTransactionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<PendingTransaction> {
        self.pending.read().clone()
    }
}

#[async_trait]
impl TransactionWatcher for InMemoryTransactionWatcher {
    async fn add_pending(
        &self,
        account: &AccountId,
        network_id: &NetworkId,
        hash: &str,
    ) -> Result<(), ConsentError> {
        self.pending.write().push(PendingTransaction {
            account: account.clone(),
            network_id: network_id.clone(),
            hash: hash.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_write_failure() {
        let store = InMemoryStore::new();
        store.set("k", Value::Bool(true)).await.unwrap();
        store.fail_writes(true);

        assert!(store.set("k", Value::Null).await.is_err());
        assert_eq!(store.get("k").await.unwrap(), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_token_visibility() {
        let tokens = InMemoryTokenRegistry::new();
        let account = AccountId::new("acc");
        let token = TokenDescriptor {
            address: "0xABC".into(),
            symbol: "ABC".into(),
            decimals: 6,
            image: None,
        };

        tokens.add(&account, None, token).await.unwrap();
        tokens.set_visible(&account, None, "0xabc", false).await.unwrap();

        let entry = tokens.find(&account, None, "0xAbC").await.unwrap().unwrap();
        assert!(!entry.visible);
    }

    #[tokio::test]
    async fn test_provider_visibility() {
        let provider = InMemoryProvider::new(ChainKind::Aptos).visible_after(Some(2));
        assert!(provider.get_transaction("0x1").await.unwrap().is_none());
        assert!(provider.get_transaction("0x1").await.unwrap().is_some());
        assert_eq!(provider.lookups(), 2);
    }

    #[test]
    fn test_missing_provider() {
        let registry = StaticProviderRegistry::new();
        assert!(matches!(
            registry.provider_for(&NetworkId::new("devnet")),
            Err(ConsentError::ProviderFailure(_))
        ));
    }
}
