//! # Health Bridge Runtime
//!
//! Runs the consultation queue simulator and logs every queue event until
//! Ctrl+C. Set `RUST_LOG` to change verbosity (default `info`).

use anyhow::{Context, Result};
use hb_runtime::{HealthBridgeRuntime, RuntimeConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = RuntimeConfig::from_env().context("Invalid environment configuration")?;

    // Create and start the runtime
    let runtime = HealthBridgeRuntime::new(config);
    runtime.start().await?;

    info!("Queue is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
