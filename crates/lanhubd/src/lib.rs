//! lanhubd — multi-client TCP server for the LanHub line protocol.
//!
//! The daemon binary wires these pieces together; integration tests start
//! the same server in-process via [`start`].

pub mod connection;
pub mod control;
pub mod interpreter;
pub mod listener;
pub mod watchdog;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use lanhub_core::HubConfig;
use lanhub_services::{FileStore, MessageLog, SessionRegistry};

use interpreter::Interpreter;

/// Shared state handed to every connection task.
pub struct Hub {
    pub config: HubConfig,
    pub registry: SessionRegistry,
    pub message_log: MessageLog,
    pub interpreter: Interpreter,
}

impl Hub {
    pub fn new(config: HubConfig) -> Result<Self> {
        let store = FileStore::new(&config.storage.files_dir).with_context(|| {
            format!(
                "failed to open file store at {}",
                config.storage.files_dir.display()
            )
        })?;
        let registry = SessionRegistry::new(config.limits.max_sessions);
        let message_log = MessageLog::new(&config.storage.message_log);
        let interpreter =
            Interpreter::new(registry.clone(), store, config.server.name.clone());

        Ok(Self {
            config,
            registry,
            message_log,
            interpreter,
        })
    }
}

/// A running server.
pub struct ServerHandle {
    pub local_addr: SocketAddr,
    pub hub: Arc<Hub>,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl ServerHandle {
    /// Stop accepting and wait for the accept loop to exit.
    ///
    /// Sessions already running finish on their own.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task.await.context("accept loop panicked")?
    }
}

/// Bind the configured address and start accepting. Must run inside a tokio runtime.
pub fn start(config: HubConfig) -> Result<ServerHandle> {
    let hub = Arc::new(Hub::new(config)?);
    let listener = listener::bind(hub.config.network.socket_addr())?;
    let local_addr = listener.local_addr()?;

    let (shutdown, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(listener::accept_loop(hub.clone(), listener, shutdown_rx));

    tracing::info!(
        addr = %local_addr,
        max_sessions = hub.config.limits.max_sessions,
        files = %hub.config.storage.files_dir.display(),
        "server listening"
    );

    Ok(ServerHandle {
        local_addr,
        hub,
        shutdown,
        task,
    })
}
