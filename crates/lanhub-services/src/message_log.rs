//! Append-only log of every line received from a peer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Plain-text message log, one `[addr] line` entry per inbound line.
#[derive(Clone)]
pub struct MessageLog {
    path: Arc<PathBuf>,
    // serialises appends so entries from different sessions never interleave
    write_lock: Arc<Mutex<()>>,
}

impl MessageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self {
            path: Arc::new(path),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Append an entry. Failures are logged and otherwise ignored.
    pub async fn append(&self, peer: &SocketAddr, line: &str) {
        let _guard = self.write_lock.lock().await;
        let entry = format!("[{peer}] {line}\n");
        if let Err(e) = self.write_entry(entry.as_bytes()).await {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append message log");
        }
    }

    async fn write_entry(&self, entry: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(entry).await?;
        file.flush().await
    }
}
