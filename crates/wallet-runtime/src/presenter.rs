//! Presenter that forwards UI requests to the host over the bridge.

use crate::bridge::HostOutput;
use async_trait::async_trait;
use consent_arbiter::ports::{Presenter, SurfaceContext};
use shared_bus::{EventPublisher, InMemoryEventBus, WalletEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct BridgePresenter {
    outbound: mpsc::UnboundedSender<HostOutput>,
    bus: Arc<InMemoryEventBus>,
}

impl BridgePresenter {
    pub fn new(outbound: mpsc::UnboundedSender<HostOutput>, bus: Arc<InMemoryEventBus>) -> Self {
        Self { outbound, bus }
    }

    fn send(&self, output: HostOutput) {
        if self.outbound.send(output).is_err() {
            warn!("Host output closed, UI update dropped");
        }
    }
}

#[async_trait]
impl Presenter for BridgePresenter {
    async fn open_approval_surface(&self, context: SurfaceContext) {
        debug!(request_id = ?context.request_id, "Requesting approval surface");
        self.send(HostOutput::Surface {
            request_id: context.request_id,
            origin: context.origin,
        });
        self.bus.publish(WalletEvent::SurfaceOpened).await;
    }

    async fn show_notification(&self, title: &str, message: &str, link: Option<&str>) {
        self.send(HostOutput::Notification {
            title: title.to_string(),
            message: message.to_string(),
            link: link.map(str::to_string),
        });
    }

    async fn set_badge(&self, text: Option<String>) {
        self.send(HostOutput::Badge { text });
    }
}
