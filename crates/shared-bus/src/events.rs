//! # Wallet Events
//!
//! | Event | Topic | Published by |
//! |-------|-------|--------------|
//! | `SurfaceOpened` | `ApprovalSurface` | presenter |
//! | `SurfaceClosed` | `ApprovalSurface` | host bridge |
//! | `WalletLocked` / `WalletUnlocked` | `LockState` | host bridge |
//! | `QueueChanged` | `Consent` | consent arbiter, after every queue mutation |
//! | `RequestSettled` | `Consent` | consent arbiter, once per request |

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
    /// The approval surface was opened or brought to front.
    SurfaceOpened,
    /// The approval surface was closed by the user or the host.
    SurfaceClosed,

    /// Key material became unavailable.
    WalletLocked,
    WalletUnlocked,

    /// The consent queue now holds `pending` requests.
    QueueChanged { pending: usize },
    /// Request `id` was resolved (`approved`) or rejected.
    RequestSettled { id: u64, approved: bool },
}

impl WalletEvent {
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::SurfaceOpened | Self::SurfaceClosed => EventTopic::ApprovalSurface,
            Self::WalletLocked | Self::WalletUnlocked => EventTopic::LockState,
            Self::QueueChanged { .. } | Self::RequestSettled { .. } => EventTopic::Consent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    ApprovalSurface,
    LockState,
    Consent,
}

/// Topics a subscription receives. No topics means every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn matches(&self, event: &WalletEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}
