//! An embeddable, tick-driven HTTP/1.1 server engine
//!
//! This crate is the transport layer of a web framework: it accepts TCP
//! connections, frames and parses HTTP/1.x requests off the wire, dispatches
//! them to an application-supplied handler, serializes the response, and
//! manages connection lifetime including keep-alive reuse and idle eviction.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request parsing with percent-decoded paths and
//!   scalar-or-list query values
//! - Keep-alive connections parked in a connection manager and serviced by a
//!   short-interval tick, so one loop drives many idle peers
//! - A total handler invocation boundary: application errors and panics
//!   become 500 responses, never crashes
//! - Request size limits enforced at the framing layer, before bodies are
//!   buffered
//! - Per-operation timeouts everywhere; no socket operation can block the
//!   loop indefinitely
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use tick_http::handler::make_handler;
//! use tick_http::protocol::{Request, Response};
//! use tick_http::server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::builder().host("127.0.0.1").port(8080).build();
//!     let handler = Arc::new(make_handler(hello));
//!
//!     if let Err(e) = Server::new(config).run(handler).await {
//!         eprintln!("server error: {e}");
//!     }
//! }
//!
//! async fn hello(request: Request) -> Result<Response, Infallible> {
//!     Ok(Response::builder()
//!         .header("Content-Type", "text/plain")
//!         .body(format!("Hello from {}!\r\n", request.path()))
//!         .build())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request/response value types and the error taxonomy
//! - [`codec`]: request framing/parsing and response serialization
//! - [`connection`]: per-connection state and the live-connection manager
//! - [`handler`]: the handler trait and its failure boundary
//! - [`server`]: bind configuration and the accept/tick/sweep loop
//!
//! # Scheduling model
//!
//! Concurrency is cooperative: every socket operation is non-blocking or
//! bounded by a short timeout. A freshly accepted connection is served its
//! first request by its own task; if keep-alive is negotiated the connection
//! is handed back to the manager, and the main loop's tick (bounded by the
//! accept poll interval, 100 ms by default) gives every parked connection
//! one step of progress. Requests on the same connection are strictly
//! ordered; fairness across connections is bounded by one poll interval.
//!
//! # Limitations
//!
//! - No TLS (use a reverse proxy for HTTPS)
//! - No HTTP/2, no chunked transfer-encoding, no request pipelining
//! - Bodies are buffered whole, bounded by `max_request_size`; there is no
//!   request or response streaming

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
