//! # JSON-Lines Bridge
//!
//! One JSON object per line in each direction.
//!
//! ```text
//! host ──{"channel":"consent","request":{...}}──→ ConsentIpcHandler
//! host ──{"channel":"event","event":{...}}──────→ wallet store + event bus
//! host ←──{"channel":"consent","response":{...}}── responses
//! host ←──{"channel":"surface" | "notification" | "badge", ...}── presenter
//! ```

use consent_arbiter::adapters::InMemoryWalletStore;
use consent_arbiter::ipc::{ConsentIpcHandler, IpcRequest, IpcResponse};
use consent_arbiter::ConsentHandle;
use serde::{Deserialize, Serialize};
use shared_bus::{EventPublisher, InMemoryEventBus, WalletEvent};
use shared_types::{AccountId, ErrorEnvelope, ErrorKind, Origin};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A line received from the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum HostMessage {
    Consent { request: IpcRequest },
    Event { event: HostEvent },
}

/// Wallet state changes reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    SurfaceClosed,
    WalletLocked,
    WalletUnlocked,
    AccountRegistered { account: AccountId, can_sign: bool },
}

/// A line sent to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum HostOutput {
    Consent {
        response: IpcResponse,
    },
    Surface {
        request_id: Option<u64>,
        origin: Option<Origin>,
    },
    Notification {
        title: String,
        message: String,
        link: Option<String>,
    },
    Badge {
        text: Option<String>,
    },
    /// A line that could not be decoded.
    Error {
        error: ErrorEnvelope,
    },
}

/// Routes host lines to the consent handler and the wallet state.
pub struct Bridge {
    handler: Arc<ConsentIpcHandler<ConsentHandle>>,
    wallets: Arc<InMemoryWalletStore>,
    bus: Arc<InMemoryEventBus>,
    outbound: mpsc::UnboundedSender<HostOutput>,
}

impl Bridge {
    pub fn new(
        handle: ConsentHandle,
        wallets: Arc<InMemoryWalletStore>,
        bus: Arc<InMemoryEventBus>,
        outbound: mpsc::UnboundedSender<HostOutput>,
    ) -> Self {
        Self {
            handler: Arc::new(ConsentIpcHandler::new(handle)),
            wallets,
            bus,
            outbound,
        }
    }

    /// Handle one host line.
    ///
    /// Consent calls run in their own task: a caller waiting for a decision
    /// must not block the line that carries that decision.
    pub async fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match serde_json::from_str::<HostMessage>(line) {
            Ok(HostMessage::Consent { request }) => {
                let handler = Arc::clone(&self.handler);
                let outbound = self.outbound.clone();
                tokio::spawn(async move {
                    let response = handler.handle(request).await;
                    if outbound.send(HostOutput::Consent { response }).is_err() {
                        warn!("Host output closed, consent response dropped");
                    }
                });
            }
            Ok(HostMessage::Event { event }) => self.apply_event(event).await,
            Err(err) => {
                warn!(error = %err, "Undecodable host line");
                let error = ErrorEnvelope::new(ErrorKind::InvalidRequest, err.to_string());
                if self.outbound.send(HostOutput::Error { error }).is_err() {
                    warn!("Host output closed, decode error dropped");
                }
            }
        }
    }

    async fn apply_event(&self, event: HostEvent) {
        debug!(event = ?event, "Host event");
        match event {
            HostEvent::SurfaceClosed => {
                self.bus.publish(WalletEvent::SurfaceClosed).await;
            }
            HostEvent::WalletLocked => {
                self.wallets.set_locked(true);
                self.bus.publish(WalletEvent::WalletLocked).await;
            }
            HostEvent::WalletUnlocked => {
                self.wallets.set_locked(false);
                self.bus.publish(WalletEvent::WalletUnlocked).await;
            }
            HostEvent::AccountRegistered { account, can_sign } => {
                info!(account = %account, can_sign, "Account registered");
                self.wallets.insert(account, can_sign);
            }
        }
    }
}

/// Write every output as one JSON line until all senders are gone.
pub async fn write_lines<W>(mut outputs: mpsc::UnboundedReceiver<HostOutput>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(output) = outputs.recv().await {
        let mut line = match serde_json::to_vec(&output) {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "Failed to encode host output");
                continue;
            }
        };
        line.push(b'\n');

        let written = async {
            writer.write_all(&line).await?;
            writer.flush().await
        };
        if let Err(err) = written.await {
            error!(error = %err, "Host output write failed");
            break;
        }
    }
}
