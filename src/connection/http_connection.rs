//! One live HTTP connection: socket, read buffer, and codec pair.
//!
//! `HttpConnection` owns the socket exclusively. Whoever holds the value (the
//! accepting task for the first request, the connection manager while parked
//! between keep-alive requests) is the only party reading, writing, or
//! closing it; ownership moves by hand-off, never by sharing.
//!
//! Two read entry points reflect the two scheduling situations:
//!
//! - [`read_request`](HttpConnection::read_request) waits for a request with
//!   a bounded timeout (the accepting task's first read)
//! - [`poll_request`](HttpConnection::poll_request) starts with a
//!   non-blocking read so an idle keep-alive peer costs nothing on a tick;
//!   only once bytes arrive does it commit to finishing the request under
//!   the same bounded timeout

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::{invoke, Handler};
use crate::protocol::{ParseError, Request, Response, SendError};

const READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Outcome of waiting for the next request on a connection.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete request was framed and parsed.
    Request(Request),
    /// No data is available right now; the connection stays as it is.
    /// Only produced by the non-blocking poll path.
    Idle,
    /// The peer closed the connection before starting a request.
    Closed,
    /// Nothing arrived within the timeout and no request had begun.
    /// A timeout *after* partial data is an error instead.
    TimedOut,
}

#[derive(Debug)]
pub struct HttpConnection {
    stream: TcpStream,
    buffer: BytesMut,
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
}

impl HttpConnection {
    pub fn new(stream: TcpStream, max_request_size: usize) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            decoder: RequestDecoder::new(max_request_size),
            encoder: ResponseEncoder::new(),
        }
    }

    /// Waits for one complete request, reading with a bounded timeout.
    pub async fn read_request(&mut self, socket_timeout: Duration) -> Result<ReadOutcome, ParseError> {
        loop {
            if let Some(request) = self.decoder.decode(&mut self.buffer)? {
                return Ok(ReadOutcome::Request(request));
            }

            match timeout(socket_timeout, self.stream.read_buf(&mut self.buffer)).await {
                Ok(Ok(0)) => {
                    if self.buffer.is_empty() {
                        return Ok(ReadOutcome::Closed);
                    }
                    // peer vanished mid-request
                    return Err(ParseError::io(io::Error::from(io::ErrorKind::UnexpectedEof)));
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => {
                    if self.buffer.is_empty() {
                        return Ok(ReadOutcome::TimedOut);
                    }
                    // partial request, the connection is torn down
                    return Err(ParseError::io(io::Error::from(io::ErrorKind::TimedOut)));
                }
            }
        }
    }

    /// Non-blocking probe for the next request on a parked connection.
    ///
    /// Leftover buffered bytes are tried first, so a request that arrived
    /// together with the previous one is picked up without touching the
    /// socket. "No data yet" (`Idle`), "peer closed" (`Closed`) and real
    /// errors each map to a distinct result.
    pub async fn poll_request(&mut self, socket_timeout: Duration) -> Result<ReadOutcome, ParseError> {
        if let Some(request) = self.decoder.decode(&mut self.buffer)? {
            return Ok(ReadOutcome::Request(request));
        }

        match self.stream.try_read_buf(&mut self.buffer) {
            Ok(0) => {
                if self.buffer.is_empty() {
                    return Ok(ReadOutcome::Closed);
                }
                Err(ParseError::io(io::Error::from(io::ErrorKind::UnexpectedEof)))
            }
            // a request has begun, commit to finishing it
            Ok(_) => self.read_request(socket_timeout).await,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(ReadOutcome::Idle),
            Err(e) => Err(e.into()),
        }
    }

    /// Serializes and writes one response, bounded by `socket_timeout`.
    pub async fn write_response(&mut self, response: &Response, socket_timeout: Duration) -> Result<(), SendError> {
        let mut wire = BytesMut::new();
        self.encoder.encode(response, &mut wire)?;

        match timeout(socket_timeout, self.stream.write_all(&wire)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Err(SendError::io(io::Error::from(io::ErrorKind::TimedOut))),
        }
    }

    /// Runs one request/response cycle: handler dispatch under the failure
    /// boundary, response write, keep-alive decision.
    ///
    /// Returns true when the connection should be kept open: the request
    /// carried `Connection: keep-alive` and the response did not force a
    /// close.
    pub async fn serve_request<H: Handler>(
        &mut self,
        request: Request,
        handler: &H,
        socket_timeout: Duration,
    ) -> Result<bool, SendError> {
        let keep_alive_requested = request.wants_keep_alive();

        let response = invoke(handler, request).await;
        let keep_alive = keep_alive_requested && !response.close_connection();

        self.write_response(&response, socket_timeout).await?;
        Ok(keep_alive)
    }

    /// Answers a protocol-level parse failure with a 400 before teardown.
    /// Best effort: a peer that already vanished is not an error here.
    pub async fn send_bad_request(&mut self, socket_timeout: Duration) {
        let response = Response::builder()
            .status(400)
            .header("Content-Type", "text/plain")
            .body("Bad Request")
            .close_connection(true)
            .build();

        if let Err(e) = self.write_response(&response, socket_timeout).await {
            debug!(cause = %e, "failed to deliver 400 response");
        }
    }

    /// Best-effort socket shutdown; dropping the value closes it regardless.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            error!(cause = %e, "shutdown connection error");
        }
    }
}
