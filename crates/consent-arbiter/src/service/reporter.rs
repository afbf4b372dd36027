//! Reflects queue size on the badge and the bus.

use crate::domain::badge_text;
use crate::ports::Presenter;
use shared_bus::{EventPublisher, InMemoryEventBus, WalletEvent};
use std::sync::Arc;

pub struct BadgeReporter {
    presenter: Arc<dyn Presenter>,
    bus: Arc<InMemoryEventBus>,
}

impl BadgeReporter {
    pub fn new(presenter: Arc<dyn Presenter>, bus: Arc<InMemoryEventBus>) -> Self {
        Self { presenter, bus }
    }

    /// Report the current queue length. Called after every queue mutation.
    pub async fn report(&self, pending: usize) {
        self.presenter.set_badge(badge_text(pending)).await;
        self.bus.publish(WalletEvent::QueueChanged { pending }).await;
    }
}
