//! LanHub integration test harness.
//!
//! Each test starts its own in-process server on 127.0.0.1 with an
//! OS-assigned port and a scratch storage directory, then talks to it over
//! real TCP connections:
//!
//!   cargo test --test integration
//!
//! Servers are independent, so tests may run in parallel.

mod files;
mod sessions;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use lanhub_core::HubConfig;
use lanhubd::ServerHandle;

pub use lanhub_core::protocol;

/// How long to wait for any single line before failing the test.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ── Harness ───────────────────────────────────────────────────────────────────

/// A running server plus the directory backing it.
pub struct TestServer {
    pub handle: ServerHandle,
    pub dir: tempfile::TempDir,
}

impl TestServer {
    pub fn addr(&self) -> SocketAddr {
        self.handle.local_addr
    }

    pub fn config(&self) -> &HubConfig {
        &self.handle.hub.config
    }

    /// Connect and consume the role greeting.
    pub async fn join(&self) -> Result<(Client, String)> {
        let mut client = Client::connect(self.addr()).await?;
        let greeting = client.recv().await?;
        Ok((client, greeting))
    }

    /// Wait until the registry holds exactly `n` sessions.
    pub async fn wait_for_sessions(&self, n: usize) -> Result<()> {
        for _ in 0..100 {
            if self.handle.hub.registry.len().await == n {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        bail!(
            "expected {n} sessions, have {}",
            self.handle.hub.registry.len().await
        )
    }
}

/// Start a server with test defaults, letting the caller adjust the config.
pub async fn start_server(tweak: impl FnOnce(&mut HubConfig)) -> Result<TestServer> {
    let dir = tempfile::tempdir().context("Unable to create temporary directory")?;
    let mut config = HubConfig::default().with_storage_root(dir.path());
    config.network.bind_address = [127, 0, 0, 1].into();
    config.network.port = 0;
    config.server.name = "Integration Hub".to_string();
    tweak(&mut config);

    let handle = lanhubd::start(config)?;
    Ok(TestServer { handle, dir })
}

/// A line-oriented protocol client.
pub struct Client {
    lines: Framed<TcpStream, LinesCodec>,
    pub local_addr: SocketAddr,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        let local_addr = stream.local_addr()?;
        Ok(Self {
            lines: Framed::new(stream, LinesCodec::new()),
            local_addr,
        })
    }

    pub async fn send(&mut self, line: &str) -> Result<()> {
        self.lines.send(line).await.context("send failed")
    }

    /// Next line from the server. Errors on timeout or close.
    pub async fn recv(&mut self) -> Result<String> {
        match tokio::time::timeout(RECV_TIMEOUT, self.lines.next()).await {
            Ok(Some(line)) => Ok(line?),
            Ok(None) => bail!("connection closed"),
            Err(_) => bail!("timed out waiting for a line"),
        }
    }

    /// Send one command and collect `n` reply lines.
    pub async fn request(&mut self, line: &str, n: usize) -> Result<Vec<String>> {
        self.send(line).await?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.recv().await?);
        }
        Ok(out)
    }

    /// Send one command and return its single reply line.
    pub async fn ask(&mut self, line: &str) -> Result<String> {
        Ok(self.request(line, 1).await?.remove(0))
    }

    /// True if the server closes the connection within `within`.
    pub async fn closed_within(&mut self, within: Duration) -> bool {
        matches!(
            tokio::time::timeout(within, self.lines.next()).await,
            Ok(None) | Ok(Some(Err(_)))
        )
    }

    /// True only for an orderly close (FIN), not a reset or read error.
    pub async fn clean_eof_within(&mut self, within: Duration) -> bool {
        matches!(
            tokio::time::timeout(within, self.lines.next()).await,
            Ok(None)
        )
    }
}
