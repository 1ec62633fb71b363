//! Usage counters and the operator stats report.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use dashmap::DashMap;

/// Process-wide counters. Initialized empty, never reset.
#[derive(Clone, Default)]
pub struct Stats {
    total_bytes: Arc<AtomicU64>,
    /// peer address -> lines received
    messages: Arc<DashMap<SocketAddr, u64>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting for a newly admitted peer.
    pub fn register(&self, peer: SocketAddr) {
        self.messages.insert(peer, 0);
    }

    /// Count one inbound line of `bytes` bytes.
    pub fn record(&self, peer: SocketAddr, bytes: u64) {
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
        *self.messages.entry(peer).or_default() += 1;
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn messages_from(&self, peer: &SocketAddr) -> u64 {
        self.messages.get(peer).map(|c| *c).unwrap_or(0)
    }

    pub fn messages(&self) -> BTreeMap<String, u64> {
        self.messages
            .iter()
            .map(|e| (e.key().to_string(), *e.value()))
            .collect()
    }
}

/// Point-in-time view of the server, written out on operator request.
#[derive(Debug, Clone)]
pub struct StatsReport {
    pub generated_at: DateTime<Local>,
    pub active_connections: usize,
    pub peers: Vec<SocketAddr>,
    pub messages: BTreeMap<String, u64>,
    pub total_bytes: u64,
}

impl StatsReport {
    /// Rewrite the report file with this snapshot.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let peers = if self.peers.is_empty() {
            "None".to_string()
        } else {
            self.peers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let messages = serde_json::to_string(&self.messages).map_err(|_| fmt::Error)?;

        writeln!(
            f,
            "--- SERVER STATS ({}) ---",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "Active connections: {}", self.active_connections)?;
        writeln!(f, "Client IPs: {peers}")?;
        writeln!(f, "Messages per client: {messages}")?;
        writeln!(f, "Total bytes: {} bytes", self.total_bytes)?;
        writeln!(f, "-------------------------------------")
    }
}
