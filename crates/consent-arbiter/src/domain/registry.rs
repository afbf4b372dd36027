//! Pending-request registry.
//!
//! Maps a request id to the one-shot completion handle of the caller waiting
//! on it. Removing the entry and sending on the handle happen together, so
//! an id settles at most once.

use super::entities::{ConsentOutcome, ConsentType, RequestId};
use super::errors::ConsentError;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

struct PendingEntry {
    sender: oneshot::Sender<ConsentOutcome>,
    registered_at: Instant,
    kind: ConsentType,
}

/// Registry counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub registered: u64,
    pub settled: u64,
    /// Settlements whose waiter had already gone away.
    pub abandoned: u64,
}

/// Completion handles keyed by request id.
///
/// Owned by the arbiter alone, so it needs no interior locking.
#[derive(Default)]
pub struct PendingRegistry {
    pending: HashMap<RequestId, PendingEntry>,
    stats: RegistryStats,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id` and get the receiving end.
    pub fn register(
        &mut self,
        id: RequestId,
        kind: ConsentType,
    ) -> oneshot::Receiver<ConsentOutcome> {
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            id,
            PendingEntry {
                sender,
                registered_at: Instant::now(),
                kind,
            },
        );
        self.stats.registered += 1;
        debug!(request_id = id, kind = %kind, "Registered completion handle");
        receiver
    }

    /// Settle `id` with `outcome`.
    ///
    /// Returns false when no handle is registered, which covers fire-and-forget
    /// requests and handles already settled.
    pub fn settle(&mut self, id: RequestId, outcome: ConsentOutcome) -> bool {
        let Some(entry) = self.pending.remove(&id) else {
            return false;
        };

        self.stats.settled += 1;
        let waited_ms = entry.registered_at.elapsed().as_millis();
        if entry.sender.send(outcome).is_err() {
            self.stats.abandoned += 1;
            debug!(request_id = id, kind = %entry.kind, "Waiter dropped before settlement");
        } else {
            debug!(request_id = id, kind = %entry.kind, waited_ms, "Completion handle settled");
        }
        true
    }

    /// Reject every listed id with `UserRejected`. Returns how many handles were hit.
    pub fn reject_all(&mut self, ids: impl IntoIterator<Item = RequestId>) -> usize {
        ids.into_iter()
            .filter(|id| self.settle(*id, Err(ConsentError::UserRejected)))
            .count()
    }

    /// Drop handles whose request is no longer queued.
    pub fn reconcile(&mut self, is_queued: impl Fn(RequestId) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|id, _| is_queued(*id));
        before - self.pending.len()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }
}
