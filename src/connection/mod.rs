//! Connection handling: the per-socket state machine and the live-set
//! registry.
//!
//! # Components
//!
//! - [`HttpConnection`]: one socket plus its read buffer and codec pair;
//!   reads requests (blocking-with-timeout or non-blocking), runs the
//!   request/response cycle, writes responses
//! - [`ConnectionRecord`] / [`ConnectionId`]: the manager's bookkeeping for
//!   one live connection
//! - [`ConnectionManager`]: owns the live set; registration, tick servicing,
//!   periodic sweep, stats
//!
//! Sockets are exclusively owned: acceptor, then per-connection task, then
//! the manager while the connection waits in keep-alive. Hand-offs between
//! task and manager travel as [`ConnectionEvent`]s.

mod http_connection;
mod manager;
mod record;

pub use http_connection::{HttpConnection, ReadOutcome};
pub use manager::{ConnectionEvent, ConnectionManager, ServerStats};
pub use record::{ConnectionId, ConnectionRecord};
