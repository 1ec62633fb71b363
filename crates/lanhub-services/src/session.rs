//! Session registry — tracks connected peers, their roles and activity.
//!
//! Sessions are keyed on the peer's socket address. The first connection
//! admitted into an empty registry is the admin; everyone else is read-only.
//! Admission (capacity check, role choice, insert) happens under one lock so
//! concurrent accepts can never overshoot the cap.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::stats::{Stats, StatsReport};

/// Authorization level of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    ReadOnly,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::ReadOnly => "read-only",
        })
    }
}

/// Something queued for delivery to a session's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Line(String),
    /// Write the notice, then close the connection.
    Disconnect(String),
}

pub type OutboundTx = mpsc::UnboundedSender<Outbound>;
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// Server-side state for one connected peer.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub peer_addr: SocketAddr,
    pub role: Role,
    pub message_count: u64,
    pub connected_at: Instant,
    pub last_activity: Instant,
    outbound: OutboundTx,
}

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { id: u64, role: Role },
    Full,
}

struct Inner {
    sessions: HashMap<SocketAddr, Session>,
    next_id: u64,
}

/// The session registry, shared between the listener and every connection task.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Inner>>,
    stats: Stats,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sessions: HashMap::new(),
                next_id: 1,
            })),
            stats: Stats::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Admit a peer if there is room.
    pub async fn admit(&self, peer_addr: SocketAddr, outbound: OutboundTx) -> Admission {
        let mut inner = self.inner.lock().await;
        if inner.sessions.len() >= self.capacity {
            return Admission::Full;
        }

        let role = if inner.sessions.is_empty() {
            Role::Admin
        } else {
            Role::ReadOnly
        };
        let id = inner.next_id;
        inner.next_id += 1;

        let now = Instant::now();
        inner.sessions.insert(
            peer_addr,
            Session {
                id,
                peer_addr,
                role,
                message_count: 0,
                connected_at: now,
                last_activity: now,
                outbound,
            },
        );
        self.stats.register(peer_addr);
        Admission::Admitted { id, role }
    }

    /// Remove a session. Safe to call more than once.
    pub async fn remove(&self, peer_addr: &SocketAddr) -> bool {
        self.inner.lock().await.sessions.remove(peer_addr).is_some()
    }

    /// Note an inbound line of `bytes` bytes from `peer_addr`.
    pub async fn record_activity(&self, peer_addr: &SocketAddr, bytes: u64) {
        self.stats.record(*peer_addr, bytes);
        if let Some(session) = self.inner.lock().await.sessions.get_mut(peer_addr) {
            session.message_count += 1;
            session.last_activity = Instant::now();
        }
    }

    /// How long since the last inbound line. `None` once the session is gone.
    pub async fn idle_for(&self, peer_addr: &SocketAddr) -> Option<Duration> {
        self.inner
            .lock()
            .await
            .sessions
            .get(peer_addr)
            .map(|s| s.last_activity.elapsed())
    }

    pub async fn role_of(&self, peer_addr: &SocketAddr) -> Option<Role> {
        self.inner.lock().await.sessions.get(peer_addr).map(|s| s.role)
    }

    pub async fn message_count(&self, peer_addr: &SocketAddr) -> Option<u64> {
        self.inner
            .lock()
            .await
            .sessions
            .get(peer_addr)
            .map(|s| s.message_count)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Active peer addresses in connection order.
    pub async fn peers(&self) -> Vec<SocketAddr> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<&Session> = inner.sessions.values().collect();
        sessions.sort_by_key(|s| s.id);
        sessions.iter().map(|s| s.peer_addr).collect()
    }

    /// Queue something for one session. Returns false if it is gone.
    pub async fn send_to(&self, peer_addr: &SocketAddr, msg: Outbound) -> bool {
        match self.inner.lock().await.sessions.get(peer_addr) {
            Some(session) => session.outbound.send(msg).is_ok(),
            None => false,
        }
    }

    /// Deliver `line` to every session except `from`.
    ///
    /// Best effort: sessions whose connection already went away are skipped.
    /// Returns how many sessions accepted the line.
    pub async fn broadcast(&self, from: &SocketAddr, line: &str) -> usize {
        let inner = self.inner.lock().await;
        let mut delivered = 0;
        for session in inner.sessions.values().filter(|s| &s.peer_addr != from) {
            if session.outbound.send(Outbound::Line(line.to_string())).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshot for the operator stats report.
    pub async fn snapshot(&self) -> StatsReport {
        let peers = self.peers().await;
        StatsReport {
            generated_at: Local::now(),
            active_connections: peers.len(),
            peers,
            messages: self.stats.messages(),
            total_bytes: self.stats.total_bytes(),
        }
    }
}
