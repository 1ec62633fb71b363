//! Idle watchdog — disconnects sessions that stop sending lines.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use lanhub_core::protocol;
use lanhub_services::{Outbound, SessionRegistry};

/// Handle to a running watchdog. Dropping it stops the watchdog.
///
/// The connection task holds this for the lifetime of the session, so every
/// teardown path (peer close, `/exit`, idle expiry, I/O error) cancels it.
pub struct Watchdog {
    handle: AbortHandle,
}

impl Watchdog {
    /// Check `peer` every `check_interval`; once it has been idle longer than
    /// `idle_timeout`, queue a disconnect notice on its outbound channel.
    pub fn spawn(
        registry: SessionRegistry,
        peer: SocketAddr,
        idle_timeout: Duration,
        check_interval: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + check_interval, check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(idle) = registry.idle_for(&peer).await else {
                    // session already torn down
                    return;
                };
                if idle > idle_timeout {
                    tracing::info!(peer = %peer, idle_secs = idle.as_secs(), "idle timeout");
                    registry
                        .send_to(&peer, Outbound::Disconnect(protocol::IDLE_DISCONNECT.to_string()))
                        .await;
                    return;
                }
            }
        });
        Self {
            handle: task.abort_handle(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
