//! # Wallet Runtime
//!
//! Hosts the consent service behind a JSON-lines bridge.
//!
//! ```text
//! stdin ──→ Bridge ──→ ConsentIpcHandler ──→ ConsentHandle ──→ ConsentService
//!             │                                                   │
//!             └──→ InMemoryWalletStore / InMemoryEventBus ←────────┘
//! stdout ←── write_lines ←── BridgePresenter, consent responses
//! ```
//!
//! ## Startup order
//!
//! 1. Open the JSON file store under `data_dir`
//! 2. Build the collaborators and the presenter
//! 3. Start the consent service (restores the persisted queue)
//! 4. Subscribe the lock listener
//! 5. Return the bridge and the output receiver

pub mod bridge;
pub mod config;
pub mod logging;
pub mod presenter;

pub use bridge::{write_lines, Bridge, HostEvent, HostMessage, HostOutput};
pub use config::{ConfigError, RuntimeConfig};
pub use logging::init_logging;
pub use presenter::BridgePresenter;

use consent_arbiter::adapters::{
    InMemoryNetworkRegistry, InMemorySiteConnector, InMemoryTokenRegistry,
    InMemoryTransactionWatcher, InMemoryWalletStore, JsonFileStore, StaticProviderRegistry,
};
use consent_arbiter::ports::StoreError;
use consent_arbiter::{Collaborators, ConsentApi, ConsentError, ConsentHandle, ConsentService};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, WalletEvent};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Startup failures.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("consent service error: {0}")]
    Consent(#[from] ConsentError),
}

/// A running wallet runtime.
pub struct WalletRuntime {
    handle: ConsentHandle,
    bridge: Arc<Bridge>,
    bus: Arc<InMemoryEventBus>,
    wallets: Arc<InMemoryWalletStore>,
    service: JoinHandle<()>,
    lock_listener: Option<JoinHandle<()>>,
}

impl WalletRuntime {
    /// Start every component. Host output is delivered on the returned receiver.
    pub async fn start(
        config: RuntimeConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<HostOutput>), RuntimeError> {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::new());
        let (outbound, outputs) = mpsc::unbounded_channel();
        let wallets = Arc::new(InMemoryWalletStore::new());

        let store = JsonFileStore::open(&config.data_dir)?;
        info!(data_dir = %store.dir().display(), "Opened consent store");

        let collaborators = Collaborators {
            store: Arc::new(store),
            wallets: Arc::clone(&wallets) as _,
            providers: Arc::new(StaticProviderRegistry::new()),
            presenter: Arc::new(BridgePresenter::new(outbound.clone(), Arc::clone(&bus))),
            sites: Arc::new(InMemorySiteConnector::new()),
            tokens: Arc::new(InMemoryTokenRegistry::new()),
            networks: Arc::new(InMemoryNetworkRegistry::new()),
            watcher: Arc::new(InMemoryTransactionWatcher::new()),
        };

        let (handle, service) =
            ConsentService::start(config.consent.clone(), collaborators, Arc::clone(&bus)).await?;

        let lock_listener = config
            .clear_on_lock
            .then(|| spawn_lock_listener(&bus, handle.clone()));

        let bridge = Arc::new(Bridge::new(
            handle.clone(),
            Arc::clone(&wallets),
            Arc::clone(&bus),
            outbound,
        ));

        info!(clear_on_lock = config.clear_on_lock, "Wallet runtime started");
        Ok((
            Self {
                handle,
                bridge,
                bus,
                wallets,
                service,
                lock_listener,
            },
            outputs,
        ))
    }

    pub fn bridge(&self) -> Arc<Bridge> {
        Arc::clone(&self.bridge)
    }

    pub fn handle(&self) -> ConsentHandle {
        self.handle.clone()
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    pub fn wallets(&self) -> Arc<InMemoryWalletStore> {
        Arc::clone(&self.wallets)
    }

    /// Stop the lock listener and wait for the consent service to drain.
    ///
    /// Bridge and handle clones held elsewhere keep the service alive; it is
    /// aborted once the grace period elapses.
    pub async fn shutdown(self) {
        let Self {
            handle,
            bridge,
            service,
            lock_listener,
            ..
        } = self;

        if let Some(listener) = lock_listener {
            listener.abort();
        }
        drop(bridge);
        drop(handle);

        let abort = service.abort_handle();
        match tokio::time::timeout(SHUTDOWN_GRACE, service).await {
            Ok(_) => info!("Consent service stopped"),
            Err(_) => {
                warn!("Consent service still running after grace period, aborting");
                abort.abort();
            }
        }
    }
}

/// Reject every pending request whenever the wallet locks.
fn spawn_lock_listener(bus: &InMemoryEventBus, api: ConsentHandle) -> JoinHandle<()> {
    let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::LockState]));
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if event != WalletEvent::WalletLocked {
                continue;
            }
            match api.clear_requests(None).await {
                Ok(cleared) => info!(cleared, "Wallet locked, pending requests cleared"),
                Err(err) => {
                    warn!(error = %err, "Consent service gone, lock listener stopping");
                    break;
                }
            }
        }
    })
}
