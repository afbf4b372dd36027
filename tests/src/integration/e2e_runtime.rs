//! # Runtime End-to-End
//!
//! Drives the wallet runtime purely through host lines, the way the host
//! process does over stdin/stdout.
//!
//! ```text
//! account_registered → wallet_unlocked → site permission request (waits)
//!        → surface line → wallet approves → site receives completion
//! ```

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use consent_arbiter::ipc::{ConsentCall, IpcRequest, IpcResponse};
    use consent_arbiter::ConsentError;
    use serde_json::{json, Value};
    use shared_types::{CallerContext, Origin};
    use tempfile::TempDir;
    use uuid::Uuid;
    use wallet_runtime::{HostOutput, RuntimeConfig, WalletRuntime};

    const SITE: &str = "https://dex.example";

    async fn boot(dir: &TempDir) -> (WalletRuntime, mpsc::UnboundedReceiver<HostOutput>) {
        let config = RuntimeConfig {
            data_dir: dir.path().to_path_buf(),
            ..RuntimeConfig::default()
        };
        WalletRuntime::start(config).await.expect("runtime starts")
    }

    fn consent_line(sender: CallerContext, call: ConsentCall) -> (Uuid, String) {
        let request = IpcRequest::new(sender, call);
        let correlation_id = request.correlation_id;
        let line = json!({ "channel": "consent", "request": request }).to_string();
        (correlation_id, line)
    }

    fn event_line(event: Value) -> String {
        json!({ "channel": "event", "event": event }).to_string()
    }

    fn permission_request() -> ConsentCall {
        ConsentCall::RequestConsent {
            request: json!({
                "account": ["0xabc"],
                "origin": SITE,
                "payload": {
                    "type": "REQUEST_PERMISSION",
                    "data": { "permissions": [{ "capability": "eth_accounts" }] }
                }
            }),
            wait_for_completion: true,
        }
    }

    /// Next output matching `pick`, skipping everything else.
    async fn expect_output<T>(
        outputs: &mut mpsc::UnboundedReceiver<HostOutput>,
        mut pick: impl FnMut(HostOutput) -> Option<T>,
    ) -> T {
        timeout(Duration::from_secs(2), async {
            loop {
                let output = outputs.recv().await.expect("output channel open");
                if let Some(found) = pick(output) {
                    return found;
                }
            }
        })
        .await
        .expect("expected host output")
    }

    async fn response_for(
        outputs: &mut mpsc::UnboundedReceiver<HostOutput>,
        wanted: impl Fn(Uuid) -> bool,
    ) -> IpcResponse {
        expect_output(outputs, |output| match output {
            HostOutput::Consent { response } if wanted(response.correlation_id) => Some(response),
            _ => None,
        })
        .await
    }

    #[tokio::test]
    async fn test_site_permission_approved_over_bridge() {
        let dir = TempDir::new().unwrap();
        let (runtime, mut outputs) = boot(&dir).await;
        let bridge = runtime.bridge();

        bridge
            .handle_line(&event_line(
                json!({ "type": "account_registered", "account": "0xabc", "can_sign": true }),
            ))
            .await;
        bridge
            .handle_line(&event_line(json!({ "type": "wallet_unlocked" })))
            .await;

        let (site_id, line) = consent_line(CallerContext::External, permission_request());
        bridge.handle_line(&line).await;

        let (request_id, origin) = expect_output(&mut outputs, |output| match output {
            HostOutput::Surface { request_id, origin } => Some((request_id, origin)),
            _ => None,
        })
        .await;
        assert_eq!(origin, Some(Origin::new(SITE)));
        let id = request_id.expect("surface names the request");

        let (approve_id, line) = consent_line(
            CallerContext::Internal,
            ConsentCall::ProcessRequest { id, approve: true },
        );
        bridge.handle_line(&line).await;

        // Approver and site are answered in either order.
        let first = response_for(&mut outputs, |cid| cid == approve_id || cid == site_id).await;
        let second = response_for(&mut outputs, |cid| cid == approve_id || cid == site_id).await;
        let (approved, site) = if first.correlation_id == approve_id {
            (first, second)
        } else {
            (second, first)
        };
        assert_eq!(
            approved.into_result().unwrap(),
            json!({
                "kind": "permissions_granted",
                "accounts": ["0xabc"],
                "capabilities": ["eth_accounts"]
            })
        );

        assert_eq!(site.into_result().unwrap()["status"], "completed");

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_locking_rejects_waiting_site() {
        let dir = TempDir::new().unwrap();
        let (runtime, mut outputs) = boot(&dir).await;
        let bridge = runtime.bridge();

        let (site_id, line) = consent_line(CallerContext::External, permission_request());
        bridge.handle_line(&line).await;
        expect_output(&mut outputs, |output| match output {
            HostOutput::Surface { .. } => Some(()),
            _ => None,
        })
        .await;

        bridge
            .handle_line(&event_line(json!({ "type": "wallet_locked" })))
            .await;

        let site = response_for(&mut outputs, |cid| cid == site_id).await;
        assert_eq!(site.into_result(), Err(ConsentError::UserRejected));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_badge_follows_queue() {
        let dir = TempDir::new().unwrap();
        let (runtime, mut outputs) = boot(&dir).await;
        let bridge = runtime.bridge();

        let (_, line) = consent_line(
            CallerContext::Internal,
            ConsentCall::RequestConsent {
                request: json!({ "account": [], "payload": { "type": "UNLOCK" } }),
                wait_for_completion: false,
            },
        );
        bridge.handle_line(&line).await;

        let badge = expect_output(&mut outputs, |output| match output {
            HostOutput::Badge { text: Some(text) } => Some(text),
            _ => None,
        })
        .await;
        assert_eq!(badge, "1");

        let (_, line) = consent_line(
            CallerContext::Internal,
            ConsentCall::ClearRequests { kind: None },
        );
        bridge.handle_line(&line).await;

        expect_output(&mut outputs, |output| match output {
            HostOutput::Badge { text: None } => Some(()),
            _ => None,
        })
        .await;

        runtime.shutdown().await;
    }
}
