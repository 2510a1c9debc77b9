use std::io;
use thiserror::Error;

/// Errors raised while framing or parsing a request.
///
/// The variants fall into three classes with different connection-level
/// handling:
///
/// - protocol errors (`MalformedRequest`, `InvalidRequestLine`,
///   `InvalidMethod`, `UnsupportedVersion`): the peer gets a 400 and the
///   connection is closed, the server keeps running
/// - limit errors (`RequestTooLarge`, `BodyTooLarge`): the connection is
///   aborted without a response
/// - I/O errors: the connection is evicted silently
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("invalid request line: {line:?}")]
    InvalidRequestLine { line: String },

    #[error("invalid http method: {method:?}")]
    InvalidMethod { method: String },

    #[error("unsupported http version: {version:?}")]
    UnsupportedVersion { version: String },

    #[error("request header size {current_size} exceeds the limit {max_size}")]
    RequestTooLarge { current_size: usize, max_size: usize },

    #[error("request body size {length} exceeds the limit {max_size}")]
    BodyTooLarge { length: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn malformed_request<S: ToString>(reason: S) -> Self {
        Self::MalformedRequest { reason: reason.to_string() }
    }

    pub fn invalid_request_line<S: ToString>(line: S) -> Self {
        Self::InvalidRequestLine { line: line.to_string() }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedVersion { version: version.to_string() }
    }

    pub fn request_too_large(current_size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { current_size, max_size }
    }

    pub fn body_too_large(length: usize, max_size: usize) -> Self {
        Self::BodyTooLarge { length, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// True for errors the peer should hear about as a 400 response.
    ///
    /// Limit and I/O errors return false: those tear the connection down
    /// without a well-formed response.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRequest { .. }
                | Self::InvalidRequestLine { .. }
                | Self::InvalidMethod { .. }
                | Self::UnsupportedVersion { .. }
        )
    }
}

/// Errors raised while serializing or writing a response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
