//! # Consent Flows
//!
//! A site and the wallet's approver talk to one consent service through the
//! IPC handler, the way every execution context does in production.
//!
//! ## Flows Tested:
//!
//! 1. **Site → queue → approver → site**: a waiting site gets the dispatch result
//! 2. **Rejection paths**: denial, bulk clear and refused admission reach the site as envelopes
//! 3. **Access control**: only the wallet may read or decide the queue
//! 4. **Bus reporting**: queue size and settlements are published

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use consent_arbiter::adapters::{
        InMemoryNetworkRegistry, InMemoryProvider, InMemorySiteConnector, InMemoryStore,
        InMemoryTokenRegistry, InMemoryTransactionWatcher, InMemoryWalletStore,
        RecordingPresenter, StaticProviderRegistry,
    };
    use consent_arbiter::ipc::{ConsentCall, ConsentIpcHandler, IpcRequest, IpcResponse};
    use consent_arbiter::{
        Collaborators, ConsentConfig, ConsentError, ConsentHandle, ConsentService,
    };
    use serde_json::{json, Value};
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, WalletEvent};
    use shared_types::{CallerContext, ChainKind, NetworkId, Origin};

    const SITE: &str = "https://app.example";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Stack {
        handler: Arc<ConsentIpcHandler<ConsentHandle>>,
        bus: Arc<InMemoryEventBus>,
        presenter: Arc<RecordingPresenter>,
        sites: Arc<InMemorySiteConnector>,
        evm: Arc<InMemoryProvider>,
    }

    async fn stack() -> Stack {
        let bus = Arc::new(InMemoryEventBus::new());
        let wallets = Arc::new(
            InMemoryWalletStore::new()
                .with_account("hot", true)
                .with_account("cold", false),
        );
        wallets.set_locked(false);
        let presenter = Arc::new(RecordingPresenter::new().with_bus(Arc::clone(&bus)));
        let sites = Arc::new(InMemorySiteConnector::new());
        let evm = Arc::new(InMemoryProvider::new(ChainKind::Evm));

        let collaborators = Collaborators {
            store: Arc::new(InMemoryStore::new()),
            wallets,
            providers: Arc::new(
                StaticProviderRegistry::new().with_provider(NetworkId::new("mainnet"), evm.clone()),
            ),
            presenter: presenter.clone(),
            sites: sites.clone(),
            tokens: Arc::new(InMemoryTokenRegistry::new()),
            networks: Arc::new(InMemoryNetworkRegistry::new()),
            watcher: Arc::new(InMemoryTransactionWatcher::new()),
        };
        let config = ConsentConfig {
            confirmation_poll_interval: Duration::from_millis(1),
            ..ConsentConfig::default()
        };

        let (handle, _task) = ConsentService::start(config, collaborators, Arc::clone(&bus))
            .await
            .expect("service starts");

        Stack {
            handler: Arc::new(ConsentIpcHandler::new(handle)),
            bus,
            presenter,
            sites,
            evm,
        }
    }

    fn sign_message(account: &str) -> Value {
        json!({
            "account": account,
            "network_id": "mainnet",
            "origin": SITE,
            "payload": { "type": "SIGN_MSG", "data": { "message": "hello" } }
        })
    }

    fn transaction() -> Value {
        json!({
            "account": "hot",
            "network_id": "mainnet",
            "origin": SITE,
            "payload": { "type": "TRANSACTION", "data": { "params": { "to": "0xbeef" } } }
        })
    }

    fn request(sender: CallerContext, call: ConsentCall) -> IpcRequest {
        IpcRequest::new(sender, call)
    }

    /// A site call that waits for the decision, running in its own task.
    fn site_waits(stack: &Stack, raw: Value) -> JoinHandle<IpcResponse> {
        let handler = Arc::clone(&stack.handler);
        tokio::spawn(async move {
            handler
                .handle(request(
                    CallerContext::External,
                    ConsentCall::RequestConsent {
                        request: raw,
                        wait_for_completion: true,
                    },
                ))
                .await
        })
    }

    async fn wallet_call(stack: &Stack, call: ConsentCall) -> Result<Value, ConsentError> {
        stack
            .handler
            .handle(request(CallerContext::Internal, call))
            .await
            .into_result()
    }

    async fn queued(stack: &Stack) -> Vec<Value> {
        let value = wallet_call(stack, ConsentCall::GetRequests).await.unwrap();
        value.as_array().cloned().unwrap_or_default()
    }

    async fn wait_for_queue(stack: &Stack, len: usize) -> Vec<Value> {
        for _ in 0..200 {
            let requests = queued(stack).await;
            if requests.len() == len {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue never reached {len} requests");
    }

    // =============================================================================
    // SITE → APPROVER → SITE
    // =============================================================================

    #[tokio::test]
    async fn test_site_receives_approved_signature() {
        let stack = stack().await;
        let site = site_waits(&stack, sign_message("hot"));

        let requests = wait_for_queue(&stack, 1).await;
        assert_eq!(requests[0]["payload"]["type"], "SIGN_MSG");
        assert_eq!(requests[0]["origin"], SITE);
        let id = requests[0]["id"].as_u64().unwrap();

        let approved = wallet_call(&stack, ConsentCall::ProcessRequest { id, approve: true })
            .await
            .unwrap();
        assert_eq!(
            approved,
            json!({ "kind": "signature", "signature": "sig:hot:hello" })
        );

        let response = timeout(Duration::from_secs(1), site).await.unwrap().unwrap();
        assert_eq!(
            response.into_result().unwrap(),
            json!({
                "status": "completed",
                "id": id,
                "response": { "kind": "signature", "signature": "sig:hot:hello" }
            })
        );
        assert_eq!(stack.presenter.surfaces().len(), 1);
        assert!(queued(&stack).await.is_empty());
    }

    #[tokio::test]
    async fn test_site_permissions_connect_accounts() {
        let stack = stack().await;
        let site = site_waits(
            &stack,
            json!({
                "account": ["hot"],
                "network_id": "mainnet",
                "origin": SITE,
                "payload": {
                    "type": "REQUEST_PERMISSION",
                    "data": { "permissions": [{ "capability": "eth_accounts" }] }
                }
            }),
        );

        let id = wait_for_queue(&stack, 1).await[0]["id"].as_u64().unwrap();
        wallet_call(&stack, ConsentCall::ProcessRequest { id, approve: true })
            .await
            .unwrap();

        let response = timeout(Duration::from_secs(1), site).await.unwrap().unwrap();
        assert_eq!(
            response.into_result().unwrap()["response"]["kind"],
            "permissions_granted"
        );
        let connected = stack.sites.connected(
            &Origin::new(SITE),
            Some(&NetworkId::new("mainnet")),
            "eth_accounts",
        );
        assert_eq!(connected, vec![shared_types::AccountId::new("hot")]);
    }

    // =============================================================================
    // REJECTION PATHS
    // =============================================================================

    #[tokio::test]
    async fn test_site_sees_denial_as_user_rejected() {
        let stack = stack().await;
        let site = site_waits(&stack, sign_message("hot"));

        let id = wait_for_queue(&stack, 1).await[0]["id"].as_u64().unwrap();
        let denied = wallet_call(&stack, ConsentCall::ProcessRequest { id, approve: false })
            .await
            .unwrap();
        assert_eq!(denied, Value::Null);

        let response = timeout(Duration::from_secs(1), site).await.unwrap().unwrap();
        let error = response.error.clone().unwrap();
        assert_eq!(error.code, 4001);
        assert_eq!(response.into_result(), Err(ConsentError::UserRejected));
    }

    #[tokio::test]
    async fn test_clear_rejects_waiting_site() {
        let stack = stack().await;
        let site = site_waits(&stack, transaction());
        wait_for_queue(&stack, 1).await;

        let cleared = wallet_call(
            &stack,
            ConsentCall::ClearRequests {
                kind: Some("TRANSACTION".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared, json!(1));

        let response = timeout(Duration::from_secs(1), site).await.unwrap().unwrap();
        assert_eq!(response.into_result(), Err(ConsentError::UserRejected));
        assert!(stack.evm.sent().is_empty());
    }

    #[tokio::test]
    async fn test_watch_only_account_refused_before_queueing() {
        let stack = stack().await;
        let response = site_waits(&stack, sign_message("cold")).await.unwrap();

        assert!(matches!(
            response.into_result(),
            Err(ConsentError::Unauthorized(_))
        ));
        assert!(queued(&stack).await.is_empty());
        assert!(stack.presenter.surfaces().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_request_type_not_supported() {
        let stack = stack().await;
        let response = site_waits(
            &stack,
            json!({ "account": "hot", "payload": { "type": "TELEPORT" } }),
        )
        .await
        .unwrap();

        assert_eq!(response.error.map(|e| e.code), Some(4200));
    }

    // =============================================================================
    // ACCESS CONTROL
    // =============================================================================

    #[tokio::test]
    async fn test_site_cannot_read_or_decide_queue() {
        let stack = stack().await;

        for call in [
            ConsentCall::GetRequests,
            ConsentCall::ClearRequests { kind: None },
            ConsentCall::ProcessRequest {
                id: 0,
                approve: true,
            },
        ] {
            let response = stack
                .handler
                .handle(request(CallerContext::External, call))
                .await;
            assert!(matches!(
                response.into_result(),
                Err(ConsentError::Unauthorized(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_deciding_unknown_request_is_invalid() {
        let stack = stack().await;
        let result = wallet_call(
            &stack,
            ConsentCall::ProcessRequest {
                id: 41,
                approve: true,
            },
        )
        .await;

        assert_eq!(result, Err(ConsentError::NotFound(41)));
    }

    // =============================================================================
    // BUS REPORTING
    // =============================================================================

    #[tokio::test]
    async fn test_bus_reports_queue_and_settlement() {
        let stack = stack().await;
        let mut events = stack
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Consent]));

        let queued_receipt = wallet_call(
            &stack,
            ConsentCall::RequestConsent {
                request: json!({ "account": [], "payload": { "type": "UNLOCK" } }),
                wait_for_completion: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(queued_receipt, json!({ "status": "queued", "id": 0 }));

        wallet_call(&stack, ConsentCall::ProcessRequest { id: 0, approve: true })
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(Some(event)) = timeout(Duration::from_millis(200), events.recv()).await {
            let drained = event == WalletEvent::QueueChanged { pending: 0 };
            seen.push(event);
            if drained {
                break;
            }
        }

        assert_eq!(
            seen,
            vec![
                WalletEvent::QueueChanged { pending: 1 },
                WalletEvent::RequestSettled {
                    id: 0,
                    approved: true
                },
                WalletEvent::QueueChanged { pending: 0 },
            ]
        );
    }
}
