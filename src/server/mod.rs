//! The acceptor and main scheduling loop.
//!
//! One loop iteration: drain connection hand-off events, wait for a new
//! connection with a bounded timeout (`poll_interval`), spawn a task for
//! anything accepted, then give every parked keep-alive connection one
//! bounded step of progress via [`ConnectionManager::service_tick`], and run
//! the defensive [`sweep`](ConnectionManager::sweep) when its interval is
//! due. The bounded accept wait is what caps keep-alive servicing staleness
//! at roughly one poll interval.
//!
//! A per-connection task serves exactly one request/response cycle, then
//! either parks the connection back into the manager (keep-alive) or reports
//! it closed. That hand-off, instead of blocking the task on another read,
//! is what lets one loop service many idle connections.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::codec::DEFAULT_MAX_REQUEST_SIZE;
use crate::connection::{ConnectionEvent, ConnectionId, ConnectionManager, HttpConnection, ReadOutcome};
use crate::handler::Handler;

/// Bind and scheduling configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    pub keep_alive_timeout: Duration,
    pub max_request_size: usize,
    pub socket_timeout: Duration,
    pub poll_interval: Duration,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            backlog: 1024,
            keep_alive_timeout: Duration::from_secs(30),
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            socket_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keep_alive_timeout = timeout;
        self
    }

    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.config.max_request_size = bytes;
        self
    }

    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.config.socket_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Listener-level failures. Fatal to the whole server, reported once at
/// startup and never retried.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot resolve listen address {address:?}: {source}")]
    InvalidAddress { address: String, source: io::Error },

    #[error("bind error: {source}")]
    Bind {
        #[from]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Binds the listening socket. The configured backlog is applied here.
    pub fn bind(self) -> Result<BoundServer, ServerError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = address
            .to_socket_addrs()
            .map_err(|source| ServerError::InvalidAddress { address: address.clone(), source })?
            .next()
            .ok_or_else(|| ServerError::InvalidAddress {
                address: address.clone(),
                source: io::Error::from(io::ErrorKind::AddrNotAvailable),
            })?;

        let socket = if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(self.config.backlog)?;

        info!(address = %addr, backlog = self.config.backlog, "listening");
        Ok(BoundServer { listener, config: self.config })
    }

    /// Binds and runs in one step.
    pub async fn run<H>(self, handler: Arc<H>) -> Result<(), ServerError>
    where
        H: Handler + 'static,
    {
        self.bind()?.run(handler).await
    }
}

/// A server with its listening socket bound, ready to serve.
#[derive(Debug)]
pub struct BoundServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl BoundServer {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept/tick/sweep loop. Never returns under normal
    /// operation; per-connection failures are contained and logged.
    pub async fn run<H>(self, handler: Arc<H>) -> Result<(), ServerError>
    where
        H: Handler + 'static,
    {
        let config = self.config;
        let mut manager = ConnectionManager::new(config.keep_alive_timeout, config.socket_timeout);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut next_sweep = Instant::now() + config.sweep_interval;

        loop {
            while let Ok(event) = event_rx.try_recv() {
                manager.apply(event);
            }

            match timeout(config.poll_interval, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    let id = manager.register(Some(peer));
                    let conn = HttpConnection::new(stream, config.max_request_size);
                    let handler = Arc::clone(&handler);
                    let event_tx = event_tx.clone();
                    let socket_timeout = config.socket_timeout;

                    tokio::spawn(async move {
                        let event = handle_connection(id, conn, handler, socket_timeout).await;
                        // the receiver outlives every task under normal
                        // operation; a dropped receiver means shutdown
                        let _ = event_tx.send(event);
                    });
                }
                Ok(Err(e)) => {
                    warn!(cause = %e, "failed to accept");
                }
                Err(_elapsed) => {}
            }

            manager.service_tick(handler.as_ref()).await;

            if Instant::now() >= next_sweep {
                manager.sweep();
                let stats = manager.stats();
                debug!(
                    total = stats.total,
                    keep_alive = stats.keep_alive_count,
                    uptime_secs = stats.uptime.as_secs(),
                    "connection stats"
                );
                next_sweep = Instant::now() + config.sweep_interval;
            }
        }
    }
}

/// Serves the first request on a freshly accepted connection, then hands it
/// back: parked for keep-alive or closed.
async fn handle_connection<H: Handler>(
    id: ConnectionId,
    mut conn: HttpConnection,
    handler: Arc<H>,
    socket_timeout: Duration,
) -> ConnectionEvent {
    match conn.read_request(socket_timeout).await {
        Ok(ReadOutcome::Request(request)) => {
            match conn.serve_request(request, handler.as_ref(), socket_timeout).await {
                Ok(true) => return ConnectionEvent::Parked(id, conn),
                Ok(false) => conn.shutdown().await,
                Err(e) => debug!(id = %id, cause = %e, "response write failed"),
            }
        }
        // a peer that connects and says nothing closes quietly
        Ok(ReadOutcome::Closed) | Ok(ReadOutcome::TimedOut) | Ok(ReadOutcome::Idle) => {}
        Err(e) if e.is_protocol_error() => {
            warn!(id = %id, cause = %e, "bad request");
            conn.send_bad_request(socket_timeout).await;
        }
        Err(e) => {
            debug!(id = %id, cause = %e, "connection error");
        }
    }

    ConnectionEvent::Closed(id)
}
