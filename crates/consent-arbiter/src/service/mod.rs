//! Consent service: the arbiter state machine and the actor that owns it.
//!
//! ```text
//! ConsentHandle ──Command──→ actor task ──→ ConsentArbiter (queue, registry)
//!                                 ↑                │ approve
//!                                 │                ↓
//!                               Settle ←── dispatch task (SideEffectDispatcher)
//! ```

mod actor;
mod admission;
mod arbiter;
mod dispatcher;
mod queue_store;
mod reporter;


pub use actor::{ConsentHandle, ConsentService};
pub use admission::AdmissionGate;
pub use arbiter::{Admitted, ConsentArbiter, Decision};
pub use dispatcher::SideEffectDispatcher;
pub use queue_store::{PersistedQueue, QueueStore};
pub use reporter::BadgeReporter;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consent arbiter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Key under which the queue record is persisted.
    pub storage_key: String,
    /// Lookups made for a transaction that is confirmed by polling.
    pub confirmation_poll_attempts: u32,
    /// Delay between two lookups.
    #[serde(with = "duration_millis")]
    pub confirmation_poll_interval: Duration,
    /// Capacity of the command channel feeding the service.
    pub command_buffer: usize,
    /// Link attached to failure notifications.
    pub approval_surface_url: Option<String>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            storage_key: "consent.queue".to_string(),
            confirmation_poll_attempts: 10,
            confirmation_poll_interval: Duration::from_secs(1),
            command_buffer: 256,
            approval_surface_url: None,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
