//! lanhubd — LanHub file sharing daemon.

use anyhow::Result;
use tokio::io::BufReader;

use lanhub_core::HubConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = HubConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = HubConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        HubConfig::default()
    });

    let report_path = config.storage.stats_report.clone();
    let server = lanhubd::start(config)?;

    // ── Operator input ───────────────────────────────────────────────────────
    let control_task = {
        let registry = server.hub.registry.clone();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = lanhubd::control::control_loop(stdin, registry, &report_path).await {
                tracing::warn!(error = %e, "operator input failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received");
    server.shutdown().await?;

    control_task.abort();
    tracing::info!("shut down");
    Ok(())
}
