//! Per-connection task: admission, the command loop, and teardown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};

use lanhub_core::protocol;
use lanhub_services::{Admission, Outbound, OutboundRx};

use crate::interpreter::Caller;
use crate::watchdog::Watchdog;
use crate::Hub;

type Lines = Framed<TcpStream, LinesCodec>;

/// How long a rejected peer may keep sending before the socket is dropped.
const REJECT_DRAIN: Duration = Duration::from_secs(2);

/// Serve one accepted TCP connection until it closes.
///
/// Never returns an error for anything the peer does; those are logged here
/// so one bad session cannot reach the accept loop.
pub async fn handle_connection(hub: Arc<Hub>, stream: TcpStream, peer: SocketAddr) {
    let mut lines = Framed::new(
        stream,
        LinesCodec::new_with_max_length(hub.config.limits.max_line_bytes),
    );
    let (tx, rx) = mpsc::unbounded_channel();

    let role = match hub.registry.admit(peer, tx).await {
        Admission::Admitted { id, role } => {
            tracing::info!(peer = %peer, session_id = id, role = %role, "client connected");
            role
        }
        Admission::Full => {
            tracing::info!(peer = %peer, "rejecting connection, server full");
            if let Err(e) = lines.send(protocol::SERVER_FULL).await {
                tracing::debug!(peer = %peer, error = %e, "failed to send rejection");
            }
            close_rejected(lines.get_mut(), peer).await;
            return;
        }
    };

    let watchdog = Watchdog::spawn(
        hub.registry.clone(),
        peer,
        hub.config.limits.idle_timeout(),
        hub.config.limits.idle_check_interval(),
    );

    let caller = Caller { addr: peer, role };
    if let Err(e) = session_loop(&hub, &caller, &mut lines, rx).await {
        tracing::warn!(peer = %peer, error = %e, "session ended with error");
    }

    drop(watchdog);
    hub.registry.remove(&peer).await;
    tracing::info!(peer = %peer, "client disconnected");
}

/// Half-close, then discard whatever the peer already sent so dropping the
/// socket ends with FIN rather than RST.
async fn close_rejected(stream: &mut TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(peer = %peer, error = %e, "failed to shut down rejected socket");
        return;
    }
    let drained =
        tokio::time::timeout(REJECT_DRAIN, tokio::io::copy(stream, &mut tokio::io::sink())).await;
    if let Ok(Ok(bytes)) = drained {
        tracing::trace!(peer = %peer, bytes, "drained rejected peer");
    }
}

async fn session_loop(
    hub: &Hub,
    caller: &Caller,
    lines: &mut Lines,
    mut outbound: OutboundRx,
) -> Result<()> {
    lines.send(protocol::welcome(caller.role)).await?;

    loop {
        tokio::select! {
            // Queued output first so a disconnect notice is flushed in order.
            biased;

            msg = outbound.recv() => match msg {
                Some(Outbound::Line(text)) => lines.send(text).await?,
                Some(Outbound::Disconnect(notice)) => {
                    lines.send(notice).await?;
                    return Ok(());
                }
                None => return Ok(()),
            },

            inbound = lines.next() => {
                let line = match inbound {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()), // peer closed
                };

                // +1 for the newline the codec stripped
                hub.registry
                    .record_activity(&caller.addr, line.len() as u64 + 1)
                    .await;
                let trimmed = line.trim();
                hub.message_log.append(&caller.addr, trimmed).await;

                let response = hub.interpreter.handle(caller, trimmed).await;
                for text in response.lines {
                    lines.send(text).await?;
                }
                if response.disconnect {
                    return Ok(());
                }
            }
        }
    }
}
