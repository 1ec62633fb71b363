//! Operator control input — `STATS` on stdin writes a stats report.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use lanhub_services::SessionRegistry;

/// Is this operator input a stats request?
pub fn is_stats_request(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("STATS")
}

/// Snapshot the registry and rewrite the report file.
pub async fn write_stats(registry: &SessionRegistry, path: &Path) -> Result<()> {
    let report = registry.snapshot().await;
    report
        .write_to(path)
        .with_context(|| format!("failed to write stats report {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        active = report.active_connections,
        total_bytes = report.total_bytes,
        "stats updated"
    );
    Ok(())
}

/// Read operator lines until EOF. Other input is ignored.
pub async fn control_loop<R>(input: R, registry: SessionRegistry, report_path: &Path) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("failed to read operator input")? {
        if !is_stats_request(&line) {
            continue;
        }
        if let Err(e) = write_stats(&registry, report_path).await {
            tracing::warn!(error = %e, "stats request failed");
        }
    }
    tracing::debug!("operator input closed");
    Ok(())
}
