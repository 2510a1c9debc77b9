//! The live-connection registry and its tick-driven servicing.
//!
//! The manager owns the set of [`ConnectionRecord`]s and drives forward
//! progress on every parked keep-alive connection, one bounded step per
//! tick. It is owned exclusively by the server loop, so the live set is
//! single-threaded by construction and needs no lock; per-connection tasks
//! hand sockets back through [`ConnectionEvent`]s on an mpsc channel that
//! the loop drains before each tick.
//!
//! Every socket operation performed here is non-blocking or bounded by the
//! socket timeout, so no single slow or idle peer can starve the others.
//! "No data yet", "peer closed" and "real error" are kept distinct: the
//! first leaves the connection untouched, the other two evict it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::connection::record::ConnectionState;
use crate::connection::{ConnectionId, ConnectionRecord, HttpConnection, ReadOutcome};
use crate::handler::Handler;

/// Hand-off messages from per-connection tasks back to the manager.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// The task finished a request cycle and the connection continues in
    /// keep-alive; the socket moves back into the manager.
    Parked(ConnectionId, HttpConnection),
    /// The connection is done; drop the record.
    Closed(ConnectionId),
}

/// Read-only observability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    /// Live connections currently tracked, in-flight and parked.
    pub total: usize,
    /// Connections parked in keep-alive wait.
    pub keep_alive_count: usize,
    /// Time since the manager was created.
    pub uptime: Duration,
}

#[derive(Debug)]
pub struct ConnectionManager {
    connections: HashMap<ConnectionId, ConnectionRecord>,
    next_id: u64,
    started_at: Instant,
    keep_alive_timeout: Duration,
    socket_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(keep_alive_timeout: Duration, socket_timeout: Duration) -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 0,
            started_at: Instant::now(),
            keep_alive_timeout,
            socket_timeout,
        }
    }

    /// Creates a record for a freshly accepted connection and returns its id.
    /// The socket itself stays with the accepting task until it is parked.
    pub fn register(&mut self, peer: Option<SocketAddr>) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.connections.insert(id, ConnectionRecord::new(id, peer));
        debug!(id = %id, peer = ?peer, "connection registered");
        id
    }

    /// Applies a hand-off event from a per-connection task.
    ///
    /// A `Parked` event for an id that was already evicted drops the
    /// connection (closing the socket); a stale `Closed` event is a no-op.
    pub fn apply(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Parked(id, conn) => match self.connections.get_mut(&id) {
                Some(record) => record.park(conn),
                None => {
                    debug!(id = %id, "parked connection was already evicted, dropping");
                }
            },
            ConnectionEvent::Closed(id) => self.evict(id),
        }
    }

    /// Removes a record. Dropping a parked record closes its socket; evicting
    /// an id that is already gone is a no-op, never an error.
    pub fn evict(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            debug!(id = %id, "connection evicted");
        }
    }

    /// Drives one bounded step of progress on every parked connection.
    ///
    /// Idle-expired and closed connections are marked and evicted after the
    /// pass; connections with a request pending are served to completion
    /// (request, handler, response) and their activity timestamp bumped.
    pub async fn service_tick<H: Handler>(&mut self, handler: &H) {
        let now = Instant::now();
        let socket_timeout = self.socket_timeout;
        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        let mut evictions = Vec::new();

        for id in ids {
            let Some(record) = self.connections.get_mut(&id) else {
                continue;
            };

            if record.is_keep_alive() && record.idle_for(now) > self.keep_alive_timeout {
                debug!(id = %id, "keep-alive timeout expired");
                evictions.push(id);
                continue;
            }

            // in-flight connections belong to their task this tick
            let ConnectionState::KeepAliveWait(conn) = record.state_mut() else {
                continue;
            };

            match conn.poll_request(socket_timeout).await {
                Ok(ReadOutcome::Idle) => {}
                Ok(ReadOutcome::Closed) | Ok(ReadOutcome::TimedOut) => {
                    evictions.push(id);
                }
                Ok(ReadOutcome::Request(request)) => {
                    match conn.serve_request(request, handler, socket_timeout).await {
                        Ok(true) => record.touch(),
                        Ok(false) => {
                            record.touch();
                            evictions.push(id);
                        }
                        Err(e) => {
                            debug!(id = %id, cause = %e, "response write failed");
                            evictions.push(id);
                        }
                    }
                }
                Err(e) if e.is_protocol_error() => {
                    warn!(id = %id, cause = %e, "bad request on keep-alive connection");
                    conn.send_bad_request(socket_timeout).await;
                    evictions.push(id);
                }
                Err(e) => {
                    debug!(id = %id, cause = %e, "connection error");
                    evictions.push(id);
                }
            }
        }

        for id in evictions {
            self.evict(id);
        }
    }

    /// Defensive periodic pass: evicts every parked record idle past the
    /// keep-alive timeout. A safety net against teardown the per-tick pass
    /// missed.
    ///
    /// In-flight records are left alone: their socket is with a task that
    /// reports back with exactly one event, and a handler slower than the
    /// keep-alive timeout is still a live request, not a stale connection.
    pub fn sweep(&mut self) {
        let now = Instant::now();
        let keep_alive_timeout = self.keep_alive_timeout;
        let before = self.connections.len();

        self.connections.retain(|_, record| {
            let stale = record.is_keep_alive() && record.idle_for(now) > keep_alive_timeout;
            if stale {
                debug!(
                    id = %record.id(),
                    peer = ?record.peer(),
                    age_secs = record.created_at().elapsed().as_secs(),
                    "sweeping stale keep-alive connection"
                );
            }
            !stale
        });

        let swept = before - self.connections.len();
        if swept > 0 {
            info!(swept, remaining = self.connections.len(), "sweep evicted stale connections");
        }
    }

    /// Non-blocking, non-mutating snapshot for observability.
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            total: self.connections.len(),
            keep_alive_count: self.connections.values().filter(|r| r.is_keep_alive()).count(),
            uptime: self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_MAX_REQUEST_SIZE;
    use crate::handler::make_handler;
    use crate::protocol::Response;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Duration::from_secs(5), Duration::from_secs(1))
    }

    async fn parked_pair(manager: &mut ConnectionManager) -> (ConnectionId, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();

        let id = manager.register(Some(peer));
        manager.apply(ConnectionEvent::Parked(id, HttpConnection::new(server, DEFAULT_MAX_REQUEST_SIZE)));
        (id, client)
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut manager = manager();
        let first = manager.register(None);
        let second = manager.register(None);
        assert!(second > first);
        assert_eq!(manager.stats().total, 2);
    }

    #[test]
    fn evict_is_idempotent() {
        let mut manager = manager();
        let id = manager.register(None);

        manager.evict(id);
        manager.evict(id);
        manager.apply(ConnectionEvent::Closed(id));
        assert_eq!(manager.stats().total, 0);
    }

    #[tokio::test]
    async fn stats_distinguish_in_flight_from_parked() {
        let mut manager = manager();
        let in_flight = manager.register(None);
        let (_parked, _client) = parked_pair(&mut manager).await;

        let stats = manager.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.keep_alive_count, 1);

        manager.evict(in_flight);
        assert_eq!(manager.stats().keep_alive_count, 1);
    }

    #[tokio::test]
    async fn parked_event_for_evicted_id_is_dropped() {
        let mut manager = manager();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();

        let id = manager.register(None);
        manager.evict(id);
        manager.apply(ConnectionEvent::Parked(id, HttpConnection::new(server, DEFAULT_MAX_REQUEST_SIZE)));
        assert_eq!(manager.stats().total, 0);
    }

    #[tokio::test]
    async fn tick_leaves_idle_connection_untouched() {
        let mut manager = manager();
        let (id, _client) = parked_pair(&mut manager).await;

        let handler = make_handler(|_req| async { Ok::<_, std::io::Error>(Response::default()) });
        manager.service_tick(&handler).await;

        assert_eq!(manager.stats().total, 1);
        manager.evict(id);
    }

    #[tokio::test]
    async fn tick_serves_a_pending_request() {
        let mut manager = manager();
        let (_id, mut client) = parked_pair(&mut manager).await;

        client
            .write_all(b"GET /again HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap();
        // let the bytes land before the non-blocking poll
        tokio::time::sleep(Duration::from_millis(20)).await;

        let handler = make_handler(|req| async move {
            Ok::<_, std::io::Error>(Response::builder().body(format!("path={}", req.path())).build())
        });
        manager.service_tick(&handler).await;

        let mut buf = vec![0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        let wire = String::from_utf8_lossy(&buf[..n]).into_owned();
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.ends_with("path=/again"));

        // keep-alive continues, the record stays
        assert_eq!(manager.stats().keep_alive_count, 1);
    }

    #[tokio::test]
    async fn tick_evicts_closed_peer() {
        let mut manager = manager();
        let (_id, client) = parked_pair(&mut manager).await;
        drop(client);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let handler = make_handler(|_req| async { Ok::<_, std::io::Error>(Response::default()) });
        manager.service_tick(&handler).await;

        assert_eq!(manager.stats().total, 0);
    }

    #[tokio::test]
    async fn tick_answers_malformed_request_with_400() {
        let mut manager = manager();
        let (_id, mut client) = parked_pair(&mut manager).await;

        client.write_all(b"NONSENSE\r\n\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let handler = make_handler(|_req| async { Ok::<_, std::io::Error>(Response::default()) });
        manager.service_tick(&handler).await;

        let mut buf = vec![0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
        assert_eq!(manager.stats().total, 0);
    }

    #[tokio::test]
    async fn expired_keep_alive_evicted_on_tick() {
        let mut manager = ConnectionManager::new(Duration::ZERO, Duration::from_secs(1));
        let (_id, _client) = parked_pair(&mut manager).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let handler = make_handler(|_req| async { Ok::<_, std::io::Error>(Response::default()) });
        manager.service_tick(&handler).await;

        assert_eq!(manager.stats().total, 0);
    }

    #[tokio::test]
    async fn sweep_evicts_stale_parked_records() {
        let mut manager = ConnectionManager::new(Duration::ZERO, Duration::from_secs(1));
        let (_id, _client) = parked_pair(&mut manager).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        manager.sweep();
        assert_eq!(manager.stats().total, 0);
    }

    #[tokio::test]
    async fn sweep_leaves_in_flight_records_alone() {
        let mut manager = ConnectionManager::new(Duration::ZERO, Duration::from_secs(1));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();

        // the first request is still with its task, however slow the handler
        let id = manager.register(None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.sweep();
        assert_eq!(manager.stats().total, 1);

        // the late park still lands and the connection stays usable
        manager.apply(ConnectionEvent::Parked(id, HttpConnection::new(server, DEFAULT_MAX_REQUEST_SIZE)));
        assert_eq!(manager.stats().keep_alive_count, 1);
    }
}
