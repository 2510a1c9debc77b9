//! Bookkeeping value for one live connection.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::connection::HttpConnection;

/// Unique identifier for a connection, monotonically assigned by the
/// manager. Collision-free for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where the connection's socket currently lives.
///
/// The socket has exactly one owner at any time. While a per-connection task
/// drives a request, the manager only holds metadata (`InFlight`); once the
/// task hands the connection back for keep-alive waiting, the socket is
/// stored here (`KeepAliveWait`) and the manager's tick drives it.
#[derive(Debug)]
pub enum ConnectionState {
    InFlight,
    KeepAliveWait(HttpConnection),
}

/// The manager's record for one live connection.
#[derive(Debug)]
pub struct ConnectionRecord {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    state: ConnectionState,
    created_at: Instant,
    last_activity: Instant,
}

impl ConnectionRecord {
    pub(crate) fn new(id: ConnectionId, peer: Option<SocketAddr>) -> Self {
        let now = Instant::now();
        Self { id, peer, state: ConnectionState::InFlight, created_at: now, last_activity: now }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// True while the connection is parked awaiting another request.
    pub fn is_keep_alive(&self) -> bool {
        matches!(self.state, ConnectionState::KeepAliveWait(_))
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(crate) fn park(&mut self, conn: HttpConnection) {
        self.state = ConnectionState::KeepAliveWait(conn);
        self.touch();
    }

    pub(crate) fn state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }
}
