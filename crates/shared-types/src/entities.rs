//! # Wallet-wide Entities
//!
//! Identifiers and definitions shared by every wallet subsystem.
//!
//! ## Clusters
//!
//! - **Accounts**: `AccountId`, `WalletId`
//! - **Networks**: `NetworkId`, `ChainKind`, `NetworkDefinition`
//! - **Callers**: `Origin`, `CallerContext`

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: ACCOUNTS
// =============================================================================

/// Identifier of a single account held by the wallet store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the wallet (key material container) owning accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub String);

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER B: NETWORKS
// =============================================================================

/// Identifier of a configured network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chain family a network belongs to.
///
/// The family decides how an approved transaction reaches the chain:
/// EVM transactions are signed before dispatch and broadcast raw, Aptos
/// transactions are submitted by the provider and confirmed by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Evm,
    Aptos,
}

impl ChainKind {
    /// Whether a transaction is signed locally before it is dispatched.
    pub const fn signs_before_dispatch(self) -> bool {
        matches!(self, Self::Evm)
    }

    /// Whether submission is confirmed asynchronously by polling.
    pub const fn confirms_by_polling(self) -> bool {
        matches!(self, Self::Aptos)
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => f.write_str("evm"),
            Self::Aptos => f.write_str("aptos"),
        }
    }
}

/// A network definition as registered by `ADD_NETWORK`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub id: NetworkId,
    pub chain_kind: ChainKind,
    /// Chain identifier as reported by the node (e.g. `0x1` for EVM mainnet).
    pub chain_id: String,
    pub name: String,
    pub rpc_urls: Vec<String>,
    pub explorer_url: Option<String>,
    pub currency_symbol: Option<String>,
}

// =============================================================================
// CLUSTER C: CALLERS
// =============================================================================

/// The requesting site, e.g. `https://app.example`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(pub String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution context a request was submitted from.
///
/// External contexts are untrusted sites and need the approval surface.
/// Internal contexts are the wallet's own programmatic flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerContext {
    External,
    Internal,
}

impl CallerContext {
    pub const fn is_external(self) -> bool {
        matches!(self, Self::External)
    }
}
