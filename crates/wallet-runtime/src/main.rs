//! # Wallet Runtime
//!
//! Reads host messages from stdin and writes replies and UI requests to
//! stdout, one JSON object per line. Logs go to stderr.
//!
//! Stops on stdin EOF or Ctrl+C.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use wallet_runtime::{init_logging, write_lines, RuntimeConfig, WalletRuntime};

const OUTPUT_DRAIN: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    init_logging(&config)?;
    config.validate().context("Invalid configuration")?;

    let (runtime, outputs) = WalletRuntime::start(config)
        .await
        .context("Failed to start wallet runtime")?;
    let writer = tokio::spawn(write_lines(outputs, tokio::io::stdout()));

    let bridge = runtime.bridge();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Wallet runtime ready. Reading host messages from stdin.");
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => bridge.handle_line(&line).await,
                None => {
                    info!("stdin closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }

    drop(bridge);
    runtime.shutdown().await;
    // Output ends once the presenter and every in-flight response are gone.
    let _ = tokio::time::timeout(OUTPUT_DRAIN, writer).await;

    info!("Wallet runtime stopped");
    Ok(())
}
