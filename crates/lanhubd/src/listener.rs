//! TCP accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::connection::handle_connection;
use crate::Hub;

const BACKLOG: i32 = 128;

/// Bind the command port with SO_REUSEADDR so restarts don't hit TIME_WAIT.
pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).context("socket()")?;

    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("bind({addr})"))?;
    socket.listen(BACKLOG).context("listen()")?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener).context("failed to register listener with tokio")
}

/// Accept connections until shutdown, one task per connection.
pub async fn accept_loop(
    hub: Arc<Hub>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("listener shutting down");
                return Ok(());
            }

            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(r) => r,
                    Err(e) => {
                        // e.g. EMFILE; keep serving existing sessions
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                tracing::debug!(peer = %peer, "accepted connection");
                tokio::spawn(handle_connection(hub.clone(), stream, peer));
            }
        }
    }
}
