//! Consent service actor.
//!
//! One task owns the `ConsentArbiter`. Every context reaches it through a
//! cloneable `ConsentHandle`, which sends commands and awaits `oneshot`
//! replies. Approved dispatches run in their own tasks and report back, so a
//! slow provider never stalls admission or other decisions.

use super::arbiter::{Admitted, ConsentArbiter, Decision};
use super::dispatcher::SideEffectDispatcher;
use super::queue_store::QueueStore;
use super::ConsentConfig;
use crate::domain::{
    ConsentError, ConsentOutcome, ConsentRequest, ConsentResponse, ConsentResult, ConsentType,
    NewConsentRequest, RequestId,
};
use crate::ports::{Collaborators, ConsentApi, ConsentReceipt};
use async_trait::async_trait;
use shared_bus::InMemoryEventBus;
use shared_types::CallerContext;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Enqueue {
        request: NewConsentRequest,
        context: CallerContext,
        wait: bool,
        reply: Reply<ConsentResult<Admitted>>,
    },
    Snapshot {
        reply: Reply<Vec<ConsentRequest>>,
    },
    Clear {
        kind: Option<ConsentType>,
        reply: Reply<usize>,
    },
    Decide {
        id: RequestId,
        approve: bool,
        reply: Reply<ConsentResult<Option<ConsentResponse>>>,
    },
}

/// Outcome of a finished dispatch, on its way back to the actor.
struct Settlement {
    id: RequestId,
    outcome: ConsentOutcome,
    reply: Reply<ConsentResult<Option<ConsentResponse>>>,
}

/// The task owning all consent state.
pub struct ConsentService {
    arbiter: ConsentArbiter,
    dispatcher: Arc<SideEffectDispatcher>,
    commands: mpsc::Receiver<Command>,
    settlements_tx: mpsc::UnboundedSender<Settlement>,
    settlements: mpsc::UnboundedReceiver<Settlement>,
    dismissals: mpsc::UnboundedReceiver<RequestId>,
}

impl ConsentService {
    /// Restore the persisted queue and spawn the service.
    ///
    /// The task stops once every `ConsentHandle` is dropped.
    pub async fn start(
        config: ConsentConfig,
        collaborators: Collaborators,
        bus: Arc<InMemoryEventBus>,
    ) -> ConsentResult<(ConsentHandle, JoinHandle<()>)> {
        let (commands_tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (settlements_tx, settlements) = mpsc::unbounded_channel();
        let (dismissals_tx, dismissals) = mpsc::unbounded_channel();

        let store = QueueStore::new(Arc::clone(&collaborators.store), config.storage_key.clone());
        let mut arbiter = ConsentArbiter::new(
            store,
            Arc::clone(&collaborators.presenter),
            Arc::clone(&collaborators.wallets),
            bus,
            dismissals_tx,
        );
        arbiter.restore().await?;

        let service = Self {
            arbiter,
            dispatcher: Arc::new(SideEffectDispatcher::new(collaborators, config)),
            commands,
            settlements_tx,
            settlements,
            dismissals,
        };
        let task = tokio::spawn(service.run());

        Ok((ConsentHandle { commands: commands_tx }, task))
    }

    async fn run(mut self) {
        info!("Consent service started");
        loop {
            tokio::select! {
                Some(settlement) = self.settlements.recv() => self.on_settlement(settlement).await,
                Some(id) = self.dismissals.recv() => {
                    self.arbiter.dismiss_unlock(id).await;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
            }
        }
        let stats = self.arbiter.registry_stats();
        info!(
            pending = self.arbiter.pending(),
            settled = stats.settled,
            abandoned = stats.abandoned,
            "Consent service stopped"
        );
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Enqueue {
                request,
                context,
                wait,
                reply,
            } => {
                let result = self.arbiter.enqueue(request, context, wait).await;
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.arbiter.snapshot());
            }
            Command::Clear { kind, reply } => {
                let cleared = self.arbiter.clear(kind).await;
                let _ = reply.send(cleared);
            }
            Command::Decide { id, approve, reply } => match self.arbiter.decide(id, approve).await {
                Ok(Decision::Denied) => {
                    let _ = reply.send(Ok(None));
                }
                Ok(Decision::Dispatch(request)) => self.spawn_dispatch(request, reply),
                Err(err) => {
                    debug!(request_id = id, error = %err, "Decision refused");
                    let _ = reply.send(Err(err));
                }
            },
        }
    }

    fn spawn_dispatch(
        &self,
        request: ConsentRequest,
        reply: Reply<ConsentResult<Option<ConsentResponse>>>,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let settlements = self.settlements_tx.clone();
        tokio::spawn(async move {
            let outcome = dispatcher.execute(&request).await;
            let settlement = Settlement {
                id: request.id,
                outcome,
                reply,
            };
            if settlements.send(settlement).is_err() {
                warn!(request_id = request.id, "Consent service gone before settlement");
            }
        });
    }

    async fn on_settlement(&mut self, settlement: Settlement) {
        let Settlement { id, outcome, reply } = settlement;
        if !self.arbiter.settle(id, outcome.clone()).await {
            warn!(request_id = id, "Dispatch finished for a request cleared meanwhile");
        }
        let _ = reply.send(outcome.map(Some));
    }
}

/// Cloneable entry point to the consent service.
#[derive(Clone)]
pub struct ConsentHandle {
    commands: mpsc::Sender<Command>,
}

impl ConsentHandle {
    async fn call<T: Send>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command + Send,
    ) -> ConsentResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ConsentError::ServiceUnavailable)?;
        response.await.map_err(|_| ConsentError::ServiceUnavailable)
    }
}

#[async_trait]
impl ConsentApi for ConsentHandle {
    async fn request_consent(
        &self,
        request: NewConsentRequest,
        context: CallerContext,
        wait_for_completion: bool,
    ) -> ConsentResult<ConsentReceipt> {
        let admitted = self
            .call(|reply| Command::Enqueue {
                request,
                context,
                wait: wait_for_completion,
                reply,
            })
            .await??;

        let Some(completion) = admitted.completion else {
            return Ok(ConsentReceipt::Queued { id: admitted.id });
        };
        let response = completion
            .await
            .map_err(|_| ConsentError::ServiceUnavailable)??;
        Ok(ConsentReceipt::Completed {
            id: admitted.id,
            response,
        })
    }

    async fn get_requests(&self) -> ConsentResult<Vec<ConsentRequest>> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    async fn clear_requests(&self, kind: Option<ConsentType>) -> ConsentResult<usize> {
        self.call(|reply| Command::Clear { kind, reply }).await
    }

    async fn process_request(
        &self,
        id: RequestId,
        approve: bool,
    ) -> ConsentResult<Option<ConsentResponse>> {
        self.call(|reply| Command::Decide { id, approve, reply })
            .await?
    }
}
