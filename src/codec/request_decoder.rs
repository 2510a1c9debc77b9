//! Request framer implementing [`tokio_util::codec::Decoder`].
//!
//! The decoder answers one question per call: is there a complete request in
//! the buffer yet? It locates the blank line that terminates the headers,
//! reads `content-length` to size the body, and only once header and body are
//! fully buffered splits the message off and hands it to the pure parser.
//! Bytes past the message (the start of a following request on a keep-alive
//! connection) stay in the buffer.
//!
//! `max_request_size` is enforced here, at the framing layer: oversized
//! headers are rejected before the body is ever read, and an oversized
//! declared body is rejected before buffering it.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::request_parser::{find_header_end, parse};
use crate::ensure;
use crate::protocol::{ParseError, Request};

/// Default cap for one request (headers plus body).
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// A decoder that frames and parses HTTP/1.x requests.
#[derive(Debug)]
pub struct RequestDecoder {
    max_request_size: usize,
}

impl RequestDecoder {
    pub fn new(max_request_size: usize) -> Self {
        Self { max_request_size }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUEST_SIZE)
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((_, body_start)) = find_header_end(src) else {
            // still inside the header section, bound its growth
            ensure!(src.len() <= self.max_request_size, ParseError::request_too_large(src.len(), self.max_request_size));
            return Ok(None);
        };

        ensure!(body_start <= self.max_request_size, ParseError::request_too_large(body_start, self.max_request_size));

        // "header absent" and "content-length: 0" are identical: no body
        let content_length = content_length(&src[..body_start])?;
        ensure!(content_length <= self.max_request_size, ParseError::body_too_large(content_length, self.max_request_size));

        let total = body_start + content_length;
        if src.len() < total {
            return Ok(None);
        }

        let message = src.split_to(total);
        parse(&message).map(Some)
    }
}

/// Case-insensitive `content-length` scan over the raw header section.
fn content_length(header_bytes: &[u8]) -> Result<usize, ParseError> {
    let header_block = String::from_utf8_lossy(header_bytes);

    for line in header_block.split('\n').skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::malformed_request(format!("invalid content-length: {:?}", value.trim())));
        }
    }

    Ok(0)
}
