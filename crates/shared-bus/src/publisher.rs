//! # Event Publisher
//!
//! Broadcast side of the wallet bus. Every subscriber sees every event and
//! applies its own topic filter.

use crate::events::{EventFilter, EventTopic, WalletEvent};
use crate::subscriber::{EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Publishing side of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// Returns the number of live subscriptions it was delivered to.
    async fn publish(&self, event: WalletEvent) -> usize;

    /// Events published on `topic` since the bus was created.
    fn published(&self, topic: EventTopic) -> u64;
}

/// In-process bus over `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<WalletEvent>,
    per_topic: Mutex<HashMap<EventTopic, u64>>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// A bus buffering up to `capacity` events per subscription before it lags.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            per_topic: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events matching `filter`.
    ///
    /// Only events published after this call are received.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "Bus subscription opened");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: WalletEvent) -> usize {
        let topic = event.topic();
        *self.per_topic.lock().entry(topic).or_insert(0) += 1;

        // Sending with no subscriptions is normal: nobody may be watching.
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(topic = ?topic, delivered, "Wallet event published");
        delivered
    }

    fn published(&self, topic: EventTopic) -> u64 {
        self.per_topic.lock().get(&topic).copied().unwrap_or(0)
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = InMemoryEventBus::new();

        assert_eq!(bus.publish(WalletEvent::SurfaceOpened).await, 0);
        assert_eq!(bus.published(EventTopic::ApprovalSurface), 1);
    }

    #[tokio::test]
    async fn test_delivery_count_ignores_filters() {
        let bus = InMemoryEventBus::new();
        let _all = bus.subscribe(EventFilter::all());
        let _surface = bus.subscribe(EventFilter::topics(vec![EventTopic::ApprovalSurface]));

        let delivered = bus.publish(WalletEvent::QueueChanged { pending: 1 }).await;

        assert_eq!(delivered, 2);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_counts_per_topic() {
        let bus = InMemoryEventBus::new();
        bus.publish(WalletEvent::WalletLocked).await;
        bus.publish(WalletEvent::WalletUnlocked).await;
        bus.publish(WalletEvent::RequestSettled {
            id: 3,
            approved: false,
        })
        .await;

        assert_eq!(bus.published(EventTopic::LockState), 2);
        assert_eq!(bus.published(EventTopic::Consent), 1);
        assert_eq!(bus.published(EventTopic::ApprovalSurface), 0);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        assert_eq!(InMemoryEventBus::with_capacity(0).capacity(), 1);
        assert_eq!(InMemoryEventBus::default().capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
