//! Adapters implementing the outbound ports.

pub mod file_store;
pub mod memory;

pub use file_store::JsonFileStore;
pub use memory::{
    InMemoryNetworkRegistry, InMemoryProvider, InMemorySiteConnector, InMemoryStore,
    InMemoryTokenRegistry, InMemoryTransactionWatcher, InMemoryWalletStore, Notification,
    PendingTransaction, RecordingPresenter, StaticProviderRegistry,
};
