//! Response serializer implementing [`tokio_util::codec::Encoder`].
//!
//! Serializes a [`Response`] into wire bytes: status line with the fixed
//! reason-phrase table, headers in the handler's insertion order (so one
//! serialization is deterministic), a blank CRLF line, then the body
//! verbatim. `Content-Length` is computed from the body when the handler did
//! not supply it, and `Content-Type` defaults to `text/html; charset=utf-8`.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{reason_phrase, Response, SendError};

/// Initial buffer size reserved for one serialized response head.
const INIT_HEADER_SIZE: usize = 4 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// An encoder that serializes HTTP/1.1 responses.
#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Encoder<&Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, response: &Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE + response.body().len());

        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", response.status(), reason_phrase(response.status()))
            .map_err(SendError::io)?;

        for (name, value) in response.headers() {
            write!(FastWrite(dst), "{name}: {value}\r\n").map_err(SendError::io)?;
        }

        if !response.has_header("content-length") {
            write!(FastWrite(dst), "Content-Length: {}\r\n", response.body().len()).map_err(SendError::io)?;
        }
        if !response.has_header("content-type") {
            write!(FastWrite(dst), "Content-Type: {DEFAULT_CONTENT_TYPE}\r\n").map_err(SendError::io)?;
        }

        dst.put_slice(b"\r\n");
        dst.put_slice(response.body());
        Ok(())
    }
}

/// Writer over `BytesMut` that skips intermediate buffering; space has
/// already been reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(response: &Response) -> String {
        let mut encoder = ResponseEncoder::new();
        let mut buffer = BytesMut::new();
        encoder.encode(response, &mut buffer).unwrap();
        String::from_utf8(buffer.to_vec()).unwrap()
    }

    #[test]
    fn default_response_layout() {
        let wire = encode(&Response::builder().body("hello").build());

        assert_eq!(wire, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Type: text/html; charset=utf-8\r\n\r\nhello");
    }

    #[test]
    fn unknown_status_reason() {
        let wire = encode(&Response::builder().status(299).build());
        assert!(wire.starts_with("HTTP/1.1 299 Unknown\r\n"));
    }

    #[test]
    fn caller_supplied_headers_not_overridden() {
        let response = Response::builder()
            .header("content-type", "application/json")
            .header("Content-Length", "2")
            .body("{}")
            .build();
        let wire = encode(&response);

        assert!(wire.contains("content-type: application/json\r\n"));
        assert!(wire.contains("Content-Length: 2\r\n"));
        // exactly one of each, no defaults appended
        assert_eq!(wire.matches("ontent-Type").count() + wire.matches("ontent-type").count(), 1);
        assert_eq!(wire.matches("ontent-Length").count() + wire.matches("ontent-length").count(), 1);
    }

    #[test]
    fn headers_serialize_in_insertion_order() {
        let response = Response::builder().header("X-B", "2").header("X-A", "1").body("").build();
        let wire = encode(&response);

        let b_pos = wire.find("X-B").unwrap();
        let a_pos = wire.find("X-A").unwrap();
        assert!(b_pos < a_pos);
    }

    #[test]
    fn body_appended_verbatim_after_blank_line() {
        let body: &[u8] = b"\x00binary\xffdata";
        let response = Response::builder().status(201).body(bytes::Bytes::from_static(body)).build();

        let mut encoder = ResponseEncoder::new();
        let mut buffer = BytesMut::new();
        encoder.encode(&response, &mut buffer).unwrap();

        assert!(buffer.starts_with(b"HTTP/1.1 201 Created\r\n"));
        assert!(buffer.ends_with(b"\r\n\r\n\x00binary\xffdata"));
    }
}
