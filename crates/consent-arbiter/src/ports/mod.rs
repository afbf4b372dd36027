//! Ports layer - hexagonal architecture interfaces.

pub mod inbound;
pub mod outbound;

pub use inbound::{ConsentApi, ConsentReceipt};
pub use outbound::{
    Collaborators, KeyValueStore, NetworkRegistry, Presenter, Provider, ProviderRegistry,
    SiteConnector, StoreError, SurfaceContext, TokenEntry, TokenRegistry, TransactionSubmission,
    TransactionWatcher, WalletInfo, WalletStore,
};
