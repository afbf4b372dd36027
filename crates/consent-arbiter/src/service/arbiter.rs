//! Consent state machine.
//!
//! `Admitted → Queued → (AwaitingDecision) → Settled`. The arbiter owns the
//! queue, the registry and the unlock watches; it is driven by exactly one
//! task, so none of them is locked.

use super::admission::AdmissionGate;
use super::queue_store::QueueStore;
use super::reporter::BadgeReporter;
use crate::domain::{
    ConsentError, ConsentOutcome, ConsentQueue, ConsentRequest, ConsentResult, ConsentType,
    NewConsentRequest, PendingRegistry, RegistryStats, RequestId,
};
use crate::ports::{Presenter, SurfaceContext, WalletStore};
use shared_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, WalletEvent};
use shared_types::CallerContext;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result of applying a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Denied and settled with `UserRejected`.
    Denied,
    /// Approved; the request is in flight until its outcome is settled.
    Dispatch(ConsentRequest),
}

/// A queued request plus the waiter's receiver, if one was asked for.
pub struct Admitted {
    pub id: RequestId,
    pub completion: Option<oneshot::Receiver<ConsentOutcome>>,
}

pub struct ConsentArbiter {
    queue: ConsentQueue,
    registry: PendingRegistry,
    in_flight: HashSet<RequestId>,
    unlock_watches: HashMap<RequestId, JoinHandle<()>>,
    store: QueueStore,
    gate: AdmissionGate,
    reporter: BadgeReporter,
    presenter: Arc<dyn Presenter>,
    wallets: Arc<dyn WalletStore>,
    bus: Arc<InMemoryEventBus>,
    dismissals: mpsc::UnboundedSender<RequestId>,
}

impl ConsentArbiter {
    /// Create an arbiter with an empty queue.
    ///
    /// Unlock requests dismissed by closing the surface are reported on
    /// `dismissals`; the owner feeds them back through `dismiss_unlock`.
    pub fn new(
        store: QueueStore,
        presenter: Arc<dyn Presenter>,
        wallets: Arc<dyn WalletStore>,
        bus: Arc<InMemoryEventBus>,
        dismissals: mpsc::UnboundedSender<RequestId>,
    ) -> Self {
        Self {
            queue: ConsentQueue::new(),
            registry: PendingRegistry::new(),
            in_flight: HashSet::new(),
            unlock_watches: HashMap::new(),
            store,
            gate: AdmissionGate::new(Arc::clone(&wallets)),
            reporter: BadgeReporter::new(Arc::clone(&presenter), Arc::clone(&bus)),
            presenter,
            wallets,
            bus,
            dismissals,
        }
    }

    /// Load the persisted queue and re-surface it.
    ///
    /// Returns the number of restored requests.
    pub async fn restore(&mut self) -> ConsentResult<usize> {
        let requests = self.store.load().await?;
        self.queue = ConsentQueue::restore(requests);

        let queue = &self.queue;
        let dropped = self.registry.reconcile(|id| queue.contains(id));
        if dropped > 0 {
            debug!(dropped, "Dropped completion handles without a queued request");
        }

        let restored = self.queue.len();
        info!(restored, next_id = self.queue.next_id(), "Consent queue restored");
        self.reporter.report(restored).await;

        if let Some(first) = self.queue.requests().first() {
            let context = SurfaceContext {
                request_id: Some(first.id),
                origin: first.origin.clone(),
            };
            self.presenter.open_approval_surface(context).await;
        }
        Ok(restored)
    }

    /// Admit, queue and persist a request.
    ///
    /// Nothing is queued when admission or persistence fails.
    pub async fn enqueue(
        &mut self,
        request: NewConsentRequest,
        context: CallerContext,
        wait_for_completion: bool,
    ) -> ConsentResult<Admitted> {
        self.gate.admit(&request).await?;

        let kind = request.kind();
        let id = self.queue.allocate_id();
        let queued = request.into_queued(id);
        let origin = queued.origin.clone();
        let position = self.queue.insert(queued);

        if let Err(err) = self.store.save(self.queue.requests()).await {
            self.queue.remove(id);
            error!(request_id = id, error = %err, "Failed to persist consent request");
            return Err(err.into());
        }

        let completion = wait_for_completion.then(|| self.registry.register(id, kind));
        info!(request_id = id, kind = %kind, position, context = ?context, "Consent request queued");
        self.reporter.report(self.queue.len()).await;

        if context.is_external() {
            if kind == ConsentType::Unlock {
                self.watch_unlock(id);
            }
            debug!(request_id = id, "Opening approval surface");
            self.presenter
                .open_approval_surface(SurfaceContext {
                    request_id: Some(id),
                    origin,
                })
                .await;
        }

        Ok(Admitted { id, completion })
    }

    pub fn snapshot(&self) -> Vec<ConsentRequest> {
        self.queue.snapshot()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Apply the approver's decision to a queued request.
    pub async fn decide(&mut self, id: RequestId, approve: bool) -> ConsentResult<Decision> {
        let Some(request) = self.queue.get(id).cloned() else {
            return Err(ConsentError::NotFound(id));
        };
        if self.in_flight.contains(&id) {
            return Err(ConsentError::InvalidRequest(format!(
                "request {id} is already being processed"
            )));
        }

        if !approve {
            info!(request_id = id, kind = %request.kind(), "Consent request denied");
            self.settle(id, Err(ConsentError::UserRejected)).await;
            return Ok(Decision::Denied);
        }

        info!(request_id = id, kind = %request.kind(), "Consent request approved");
        self.in_flight.insert(id);
        Ok(Decision::Dispatch(request))
    }

    /// Settle `id` once: remove it, persist, and complete its handle.
    ///
    /// Returns false when the request is no longer queued (cleared while
    /// its dispatch was running, or already settled).
    pub async fn settle(&mut self, id: RequestId, outcome: ConsentOutcome) -> bool {
        let Some(request) = self.queue.remove(id) else {
            debug!(request_id = id, "Settlement for unknown request ignored");
            return false;
        };
        self.in_flight.remove(&id);
        self.stop_watch(id);

        if let Err(err) = self.store.save(self.queue.requests()).await {
            // The entry reappears on restart and is decided again.
            error!(request_id = id, error = %err, "Failed to persist settled request removal");
        }

        let approved = outcome.is_ok();
        match &outcome {
            Ok(_) => info!(request_id = id, kind = %request.kind(), "Consent request settled"),
            Err(err) => info!(request_id = id, kind = %request.kind(), error = %err, "Consent request rejected"),
        }
        self.registry.settle(id, outcome);
        self.bus.publish(WalletEvent::RequestSettled { id, approved }).await;
        self.reporter.report(self.queue.len()).await;
        true
    }

    /// Reject and remove every request of `kind`, or all of them.
    pub async fn clear(&mut self, kind: Option<ConsentType>) -> usize {
        let drained = self.queue.drain_matching(kind);
        if drained.is_empty() {
            return 0;
        }

        if let Err(err) = self.store.save(self.queue.requests()).await {
            error!(error = %err, "Failed to persist cleared consent queue");
        }

        for request in &drained {
            self.in_flight.remove(&request.id);
            self.stop_watch(request.id);
        }
        let rejected = self
            .registry
            .reject_all(drained.iter().map(|request| request.id));
        for request in &drained {
            self.bus
                .publish(WalletEvent::RequestSettled {
                    id: request.id,
                    approved: false,
                })
                .await;
        }

        info!(cleared = drained.len(), rejected, kind = ?kind, "Consent requests cleared");
        self.reporter.report(self.queue.len()).await;
        drained.len()
    }

    /// Reject an unlock request whose surface was closed while still locked.
    pub async fn dismiss_unlock(&mut self, id: RequestId) -> bool {
        self.unlock_watches.remove(&id);
        match self.queue.get(id) {
            Some(request) if request.kind() == ConsentType::Unlock => {
                info!(request_id = id, "Approval surface closed while locked");
                self.settle(id, Err(ConsentError::UserRejected)).await
            }
            _ => false,
        }
    }

    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Active unlock watches.
    pub fn unlock_watch_count(&self) -> usize {
        self.unlock_watches.len()
    }

    fn watch_unlock(&mut self, id: RequestId) {
        // Subscribe before the surface opens so no close event is missed.
        let mut subscription = self
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::ApprovalSurface]));
        let wallets = Arc::clone(&self.wallets);
        let dismissals = self.dismissals.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if event != WalletEvent::SurfaceClosed {
                    continue;
                }
                if wallets.is_locked().await && dismissals.send(id).is_err() {
                    warn!(request_id = id, "Consent service gone, unlock dismissal dropped");
                }
                break;
            }
        });
        self.unlock_watches.insert(id, handle);
    }

    fn stop_watch(&mut self, id: RequestId) {
        if let Some(handle) = self.unlock_watches.remove(&id) {
            handle.abort();
        }
    }
}
